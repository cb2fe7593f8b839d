/*!

Types shared by the vSphere machine driver and anything that writes its machine classes.

!*/

mod provider_spec;

pub use provider_spec::{
    BootConfigFormat, Error, Result, VsphereProviderSpec, DEFAULT_IGNITION_INSTALL_PATH,
    DEFAULT_NETWORK_ADAPTER,
};

/// The secret key holding the vCenter host, e.g. `vcenter.example.com` or `https://10.0.0.1`.
pub const SECRET_KEY_HOST: &str = "vsphereHost";
/// The secret key holding the vCenter user name.
pub const SECRET_KEY_USERNAME: &str = "vsphereUsername";
/// The secret key holding the vCenter password.
pub const SECRET_KEY_PASSWORD: &str = "vspherePassword";
/// The secret key that, when `true`, disables verification of the vCenter TLS certificate.
pub const SECRET_KEY_INSECURE_SSL: &str = "vsphereInsecureSSL";
pub use machine_model::constants::SECRET_KEY_USER_DATA;

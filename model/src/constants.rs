// Environment variables read by driver binaries.
pub const ENV_MACHINE_ACTION: &str = "MACHINE_DRIVER_ACTION";
pub const ENV_MACHINE_ID: &str = "MACHINE_DRIVER_MACHINE_ID";
pub const ENV_MACHINE_NAME: &str = "MACHINE_DRIVER_MACHINE_NAME";
pub const ENV_PROVIDER_SPEC_PATH: &str = "MACHINE_DRIVER_PROVIDER_SPEC";
pub const ENV_SECRET_NAME: &str = "MACHINE_DRIVER_SECRET_NAME";
pub const ENV_SECRETS_DIR: &str = "MACHINE_DRIVER_SECRETS_DIR";

// Paths
pub const SECRETS_PATH: &str = "/secrets";

// Keys shared by every provider's machine class secret.
pub const SECRET_KEY_USER_DATA: &str = "userData";

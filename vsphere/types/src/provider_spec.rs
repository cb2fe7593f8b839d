use machine_model::Configuration;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::{ensure, Snafu};
use std::collections::BTreeMap;

pub const DEFAULT_IGNITION_INSTALL_PATH: &str = "/var/lib/coreos-install";
pub const DEFAULT_NETWORK_ADAPTER: &str = "vmxnet3";

/// The error returned when a provider spec cannot be used.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
enum InnerError {
    #[snafu(display("'{}' is required", field))]
    MissingField { field: &'static str },

    #[snafu(display("'folder' must be relative to the datacenter 'vm' folder, got '{}'", folder))]
    AbsoluteFolder { folder: String },

    #[snafu(display("Only one of 'resourcePool' and 'computeCluster' may be set"))]
    AmbiguousPlacement,

    #[snafu(display("'{}' must be greater than zero", field))]
    Zero { field: &'static str },
}

/// How the boot configuration is handed to the guest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BootConfigFormat {
    /// `userData` is a cloud-config document or a shell script and is passed as
    /// `guestinfo.userdata`.
    CloudInit,
    /// `userData` is wrapped into an ignition config and passed as `guestinfo.coreos.config.data`.
    Ignition,
}

impl Default for BootConfigFormat {
    fn default() -> Self {
        Self::CloudInit
    }
}

derive_display_from_serialize!(BootConfigFormat);
derive_fromstr_from_deserialize!(BootConfigFormat);

/// The provider specific part of a machine class.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsphereProviderSpec {
    /// The datacenter that holds the machines.
    pub datacenter: String,

    /// A folder below the datacenter `vm` folder. Machines are placed directly in the `vm` folder
    /// when this is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// The name (or inventory path) of the network the machines are attached to.
    #[serde(default)]
    pub network: String,

    /// Selects among several networks of the same name, e.g. port groups of different
    /// distributed switches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_uuid: Option<String>,

    /// The VM or template that machines are cloned from.
    #[serde(default)]
    pub template_vm: String,

    /// The inventory path of the resource pool to place machines in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<String>,

    /// The compute cluster whose root resource pool machines are placed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_cluster: Option<String>,

    /// The datastore for the machine's files. The template's datastore is used if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<String>,

    #[serde(default)]
    pub num_cpus: u32,

    /// Memory in MiB.
    #[serde(default)]
    pub memory: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,

    /// Extra `key=value` settings for the VM configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_config: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<String>,

    /// Custom field values written to every machine. A VM belongs to the machine class when it
    /// carries all of them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub boot_config: BootConfigFormat,

    /// Password hash of the `core` user when `bootConfig` is `ignition`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignition_passwd_hash: Option<String>,

    /// Directory that receives the user data when `bootConfig` is `ignition`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignition_install_path: Option<String>,
}

impl Configuration for VsphereProviderSpec {}

impl VsphereProviderSpec {
    /// Checks the fields needed to look machines up.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.datacenter.is_empty(),
            MissingFieldSnafu {
                field: "datacenter"
            }
        );
        if let Some(folder) = self.folder() {
            ensure!(
                !folder.starts_with('/'),
                AbsoluteFolderSnafu { folder }
            );
        }
        Ok(())
    }

    /// Checks the fields needed to create machines.
    pub fn validate_for_create(&self) -> Result<()> {
        self.validate()?;
        ensure!(
            !self.template_vm.is_empty(),
            MissingFieldSnafu {
                field: "templateVm"
            }
        );
        ensure!(
            !self.network.is_empty(),
            MissingFieldSnafu { field: "network" }
        );
        ensure!(
            self.resource_pool.is_none() || self.compute_cluster.is_none(),
            AmbiguousPlacementSnafu
        );
        ensure!(self.num_cpus > 0, ZeroSnafu { field: "numCpus" });
        ensure!(self.memory > 0, ZeroSnafu { field: "memory" });
        if self.boot_config == BootConfigFormat::Ignition {
            ensure!(
                self.ignition_passwd_hash.is_some(),
                MissingFieldSnafu {
                    field: "ignitionPasswdHash"
                }
            );
        }
        Ok(())
    }

    /// The configured folder, `None` when unset or empty.
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref().filter(|folder| !folder.is_empty())
    }

    /// The configured switch UUID, `None` when unset or empty.
    pub fn switch_uuid(&self) -> Option<&str> {
        self.switch_uuid.as_deref().filter(|uuid| !uuid.is_empty())
    }

    pub fn ignition_install_path(&self) -> &str {
        self.ignition_install_path
            .as_deref()
            .unwrap_or(DEFAULT_IGNITION_INSTALL_PATH)
    }
}

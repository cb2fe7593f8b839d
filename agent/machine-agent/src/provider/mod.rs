mod error;

pub use self::error::{AsErrorCode, ErrorCode, IntoProviderError, ProviderError, ProviderResult};
use crate::clients::SecretClient;
use machine_model::{Configuration, SecretName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The machine class a driver works against: the provider specific configuration and the name of
/// the secret that holds credentials and user data.
#[derive(Debug, Clone, Serialize)]
pub struct Spec<C>
where
    C: Configuration,
{
    pub configuration: C,
    pub secret_name: SecretName,
}

/// A request that addresses a single machine.
#[derive(Debug, Clone, Serialize)]
pub struct MachineRequest<C>
where
    C: Configuration,
{
    /// The name of the machine, which is also the name of the VM and of the node it becomes.
    pub machine_name: String,

    /// The provider's ID of the machine if the controller knows it. When present it is preferred
    /// over the name for lookups.
    pub machine_id: Option<String>,

    pub spec: Spec<C>,
}

impl<C> MachineRequest<C>
where
    C: Configuration,
{
    /// The machine ID, or `None` if it was not given or is empty.
    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Describes a machine that exists.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    /// The provider's unique ID of the machine.
    pub machine_id: String,

    /// The name of the node that the machine registers as.
    pub node_name: String,
}

impl Configuration for MachineInfo {}

/// The outcome of a delete request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMachine {
    /// The ID of the machine that was deleted, `None` if there was nothing to delete.
    pub machine_id: Option<String>,
}

impl Configuration for DeletedMachine {}

/// The machines that belong to a machine class.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineList {
    /// Machine IDs mapped to machine names.
    pub machines: BTreeMap<String, String>,
}

impl Configuration for MachineList {}

/// You implement the [`Driver`] trait in order to manage machines. This type is then injected
/// into the [`Agent`] object which runs the single operation that the controller requested.
///
/// `Config` is the provider specific part of a machine class, i.e. the information you need in
/// order to create machines. For example, the datacenter and the template to clone from.
///
/// Lookups prefer `machine_id` over `machine_name` when the request carries one. An absent
/// machine must be reported with [`ErrorCode::NotFound`] so that the controller can treat it as
/// non-fatal.
///
#[async_trait::async_trait]
pub trait Driver: Sized + Send + Sync {
    type Config: Configuration;

    /// Create the machine described by `request`. If the machine already exists, return it.
    async fn create_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient;

    /// Power off and destroy the machine. A machine that does not exist is not an error.
    async fn delete_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<DeletedMachine>
    where
        I: SecretClient;

    /// Power off the machine but keep it.
    async fn shutdown_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient;

    /// Find the machine and report its ID.
    async fn get_machine_status<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient;

    /// List the machines that were created for the machine class.
    async fn list_machines<I>(
        &self,
        spec: Spec<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineList>
    where
        I: SecretClient;
}

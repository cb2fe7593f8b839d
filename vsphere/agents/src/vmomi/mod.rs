/*!

A small client for the VI/JSON binding of the vSphere web services API. Only the calls that the
machine driver needs are implemented.

The [`Vim`] trait is the seam between the driver logic and the remote API so that the lookups,
power operations and the folder walk can be tested against an in-memory inventory.

!*/

mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
mod types;

pub use client::{sdk_url, VimClient, DEFAULT_API_RELEASE};
pub use error::{Error, Result};
pub use types::*;

use log::trace;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

/// How often a running task is polled.
pub const TASK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The remote calls the driver makes. Tasks are started by the `*_task`-like methods, which
/// return the task reference; use [`wait_for_result`] to wait for the outcome.
#[async_trait::async_trait]
pub trait Vim: Send + Sync {
    /// `SearchIndex.FindByInventoryPath`. `None` when nothing lives at `path`.
    async fn find_by_inventory_path(&self, path: &str) -> Result<Option<ManagedObjectReference>>;

    /// `SearchIndex.FindByUuid` for virtual machines by BIOS UUID.
    async fn find_vm_by_uuid(
        &self,
        datacenter: &ManagedObjectReference,
        uuid: &str,
    ) -> Result<Option<ManagedObjectReference>>;

    async fn folders(&self, datacenter: &ManagedObjectReference) -> Result<DatacenterFolders>;

    /// The direct children of a folder.
    async fn children(&self, folder: &ManagedObjectReference)
        -> Result<Vec<ManagedObjectReference>>;

    async fn name(&self, object: &ManagedObjectReference) -> Result<String>;

    /// Retrieves `name`, `customValue` and `config.uuid` of all `objects` at once.
    async fn retrieve_entities(
        &self,
        objects: &[ManagedObjectReference],
    ) -> Result<Vec<ManagedEntity>>;

    async fn power_state(&self, vm: &ManagedObjectReference) -> Result<PowerState>;

    /// The BIOS UUID of a virtual machine.
    async fn vm_uuid(&self, vm: &ManagedObjectReference) -> Result<String>;

    async fn power_off(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    async fn power_on(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    async fn destroy(&self, object: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    async fn clone_vm(
        &self,
        template: &ManagedObjectReference,
        folder: &ManagedObjectReference,
        name: &str,
        spec: &VirtualMachineCloneSpec,
    ) -> Result<ManagedObjectReference>;

    async fn task_info(&self, task: &ManagedObjectReference) -> Result<TaskInfo>;

    /// `CustomFieldsManager.field`.
    async fn custom_fields(&self) -> Result<Vec<CustomFieldDef>>;

    async fn add_custom_field(&self, name: &str, mo_type: &str) -> Result<CustomFieldDef>;

    async fn set_custom_value(
        &self,
        object: &ManagedObjectReference,
        key: &str,
        value: &str,
    ) -> Result<()>;

    /// The backing that connects an ethernet card to `network`.
    async fn network_backing(
        &self,
        network: &ManagedObjectReference,
    ) -> Result<EthernetCardBackingInfo>;

    /// The ethernet cards of a virtual machine in device order.
    async fn ethernet_cards(&self, vm: &ManagedObjectReference) -> Result<Vec<VirtualEthernetCard>>;

    /// The `resourcePool` of a virtual machine or compute resource.
    async fn resource_pool(&self, object: &ManagedObjectReference)
        -> Result<ManagedObjectReference>;

    async fn logout(&self) -> Result<()>;
}

/// Polls `task` until it has finished and returns its result.
pub async fn wait_for_result<V>(vim: &V, task: &ManagedObjectReference) -> Result<Option<Value>>
where
    V: Vim + ?Sized,
{
    loop {
        let info = vim.task_info(task).await?;
        match info.state {
            TaskState::Success => return Ok(info.result),
            TaskState::Error => {
                return error::TaskFailedSnafu {
                    task: task.value.clone(),
                    message: info
                        .error
                        .map(|fault| fault.message())
                        .unwrap_or_else(|| "unknown fault".to_string()),
                }
                .fail()
            }
            TaskState::Queued | TaskState::Running => {
                trace!("Task '{}' is {:?}", task.value, info.state);
                tokio::time::sleep(TASK_POLL_INTERVAL).await;
            }
        }
    }
}

/// Waits for a task whose result is a managed object, e.g. the VM created by a clone.
pub async fn wait_for_reference<V>(
    vim: &V,
    task: &ManagedObjectReference,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let result = wait_for_result(vim, task).await?.context(error::TaskResultSnafu {
        task: task.value.clone(),
    })?;
    serde_json::from_value(result).context(error::TaskResultTypeSnafu {
        task: task.value.clone(),
    })
}

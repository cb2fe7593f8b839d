/*!

Looks up, powers off and destroys machines. Each remote operation starts a task and then waits
for its result.

!*/

use crate::error::{self, Result};
use crate::find::find_vm;
use crate::vmomi::{self, ManagedObjectReference, PowerState, Vim};
use log::info;
use snafu::ResultExt;
use vsphere_types::VsphereProviderSpec;

/// The UUID of the machine's VM.
pub async fn machine_id<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    machine_id: Option<&str>,
) -> Result<String>
where
    V: Vim + ?Sized,
{
    let vm = find_vm(vim, spec, machine_name, machine_id).await?;
    vim.vm_uuid(&vm).await.context(error::UuidSnafu)
}

/// Powers off the machine's VM and returns its UUID.
pub async fn shutdown_vm<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    machine_id: Option<&str>,
) -> Result<String>
where
    V: Vim + ?Sized,
{
    let vm = do_shutdown(vim, spec, machine_name, machine_id).await?;
    vim.vm_uuid(&vm).await.context(error::UuidSnafu)
}

/// Powers off and destroys the machine's VM. Returns the UUID the VM had.
pub async fn delete_vm<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    machine_id: Option<&str>,
) -> Result<String>
where
    V: Vim + ?Sized,
{
    let vm = do_shutdown(vim, spec, machine_name, machine_id).await?;
    let found_machine_id = vim.vm_uuid(&vm).await.context(error::UuidSnafu)?;

    info!("Destroying VM '{}'", machine_name);
    let task = vim.destroy(&vm).await.context(error::StartDestroySnafu)?;
    vmomi::wait_for_result(vim, &task)
        .await
        .context(error::DestroySnafu)?;
    Ok(found_machine_id)
}

/// Deletes the machine's VM. A VM that does not exist needs no deleting, so `None` is returned
/// for it instead of an error.
pub async fn delete_machine<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    machine_id: Option<&str>,
) -> Result<Option<String>>
where
    V: Vim + ?Sized,
{
    match delete_vm(vim, spec, machine_name, machine_id).await {
        Ok(found_machine_id) => Ok(Some(found_machine_id)),
        Err(e) if e.is_not_found() => {
            info!("{}, nothing to delete", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn do_shutdown<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    machine_id: Option<&str>,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let vm = find_vm(vim, spec, machine_name, machine_id).await?;
    power_off(vim, &vm, machine_name).await?;
    Ok(vm)
}

/// Powers off `vm` unless it is already off or suspended.
pub async fn power_off<V>(vim: &V, vm: &ManagedObjectReference, machine_name: &str) -> Result<()>
where
    V: Vim + ?Sized,
{
    let power_state = vim.power_state(vm).await.context(error::PowerStateSnafu)?;
    if power_state == PowerState::PoweredOn {
        info!("Powering off VM '{}'", machine_name);
        let task = vim.power_off(vm).await.context(error::StartPowerOffSnafu)?;
        vmomi::wait_for_result(vim, &task)
            .await
            .context(error::PowerOffSnafu)?;
    }
    Ok(())
}

/// Powers on `vm`.
pub async fn power_on<V>(vim: &V, vm: &ManagedObjectReference, machine_name: &str) -> Result<()>
where
    V: Vim + ?Sized,
{
    info!("Powering on VM '{}'", machine_name);
    let task = vim.power_on(vm).await.context(error::StartPowerOnSnafu)?;
    vmomi::wait_for_result(vim, &task)
        .await
        .context(error::PowerOnSnafu)?;
    Ok(())
}

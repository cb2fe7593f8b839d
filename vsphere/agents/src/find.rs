/*!

Resolves a machine to its virtual machine, either by the inventory path derived from the machine
name or, when the controller knows it, by the BIOS UUID of the VM.

!*/

use crate::error::{self, Result};
use crate::vmomi::{ManagedObjectReference, Vim};
use log::debug;
use snafu::{OptionExt, ResultExt};
use vsphere_types::VsphereProviderSpec;

/// Finds the VM of a machine. A non-empty `machine_id` takes precedence over the name.
pub async fn find_vm<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    machine_id: Option<&str>,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    match machine_id.filter(|id| !id.is_empty()) {
        Some(machine_id) => find_by_uuid(vim, spec, machine_id).await,
        None => find_by_inventory_path(vim, spec, machine_name).await,
    }
}

/// The inventory path of a machine's VM: `/{datacenter}/vm[/{folder}]/{machine_name}`.
pub fn vm_inventory_path(spec: &VsphereProviderSpec, machine_name: &str) -> String {
    match spec.folder() {
        Some(folder) => format!("/{}/vm/{}/{}", spec.datacenter, folder, machine_name),
        None => format!("/{}/vm/{}", spec.datacenter, machine_name),
    }
}

pub async fn find_by_inventory_path<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let path = vm_inventory_path(spec, machine_name);
    debug!("Looking up '{}'", path);
    vim.find_by_inventory_path(&path)
        .await
        .context(error::FindByInventoryPathSnafu { path: &path })?
        .filter(|found| found.is_virtual_machine())
        .context(error::MachineNotFoundSnafu { name: machine_name })
}

pub async fn find_by_uuid<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_id: &str,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let datacenter = datacenter(vim, spec).await?;
    debug!("Looking up VM with UUID '{}'", machine_id);
    vim.find_vm_by_uuid(&datacenter, machine_id)
        .await
        .context(error::FindByUuidSnafu { machine_id })?
        .context(error::MachineIdNotFoundSnafu { machine_id })
}

/// The datacenter named in the provider spec.
pub async fn datacenter<V>(vim: &V, spec: &VsphereProviderSpec) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let path = format!("/{}", spec.datacenter);
    vim.find_by_inventory_path(&path)
        .await
        .context(error::RemoteSnafu {
            what: format!("find datacenter \"{}\"", spec.datacenter),
        })?
        .filter(|found| found.kind == "Datacenter")
        .context(error::DatacenterNotFoundSnafu {
            datacenter: &spec.datacenter,
        })
}

/// Looks up an object below a datacenter root folder, e.g. `host` or `datastore`. Absolute paths
/// are used as they are.
pub async fn find_object<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    root: &str,
    kind: &'static str,
    name: &str,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let path = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{}/{}/{}", spec.datacenter, root, name)
    };
    vim.find_by_inventory_path(&path)
        .await
        .context(error::FindByInventoryPathSnafu { path: &path })?
        .context(error::ObjectNotFoundSnafu { kind, path })
}

/*!

Walks the virtual machines of the machine class folder together with their custom field values.

!*/

use crate::error::{self, Result};
use crate::find::datacenter;
use crate::vmomi::{CustomFieldDef, ManagedEntity, ManagedObjectReference, Vim};
use log::debug;
use snafu::ResultExt;
use std::collections::{BTreeMap, HashMap};
use vsphere_types::VsphereProviderSpec;

/// Calls `visitor` for every VM directly inside the configured folder, in folder order. The first
/// visitor error ends the walk.
pub async fn visit_virtual_machines<V, F>(
    vim: &V,
    spec: &VsphereProviderSpec,
    mut visitor: F,
) -> Result<()>
where
    V: Vim + ?Sized,
    F: FnMut(&ManagedEntity, &[CustomFieldDef]) -> Result<()>,
{
    let datacenter = datacenter(vim, spec).await?;
    let folders = vim.folders(&datacenter).await.context(error::RemoteSnafu {
        what: "reading datacenter folders",
    })?;
    let folder = match spec.folder() {
        Some(path) => folder_by_path(vim, &folders.vm_folder, path).await?,
        None => folders.vm_folder,
    };

    let vms: Vec<ManagedObjectReference> = vim
        .children(&folder)
        .await
        .context(error::RemoteSnafu {
            what: "listing folder children",
        })?
        .into_iter()
        .filter(|child| child.is_virtual_machine())
        .collect();
    debug!("Visiting {} VMs", vms.len());

    let entities: HashMap<ManagedObjectReference, ManagedEntity> = vim
        .retrieve_entities(&vms)
        .await
        .context(error::DefaultCollectorSnafu)?
        .into_iter()
        .map(|entity| (entity.self_ref.clone(), entity))
        .collect();
    let fields = vim.custom_fields().await.context(error::FieldSnafu)?;

    for vm in &vms {
        let entity = match entities.get(vm) {
            Some(entity) => entity,
            None => {
                debug!("Skipping {}, it has no properties", vm);
                continue;
            }
        };
        visitor(entity, &fields).map_err(|e| error::Error::Visit {
            name: entity.name.clone(),
            source: Box::new(e),
        })?;
    }
    Ok(())
}

/// Follows `path` from `root` one folder name at a time, so that `a/b` is the folder `b` inside
/// `a`.
async fn folder_by_path<V>(
    vim: &V,
    root: &ManagedObjectReference,
    path: &str,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let mut folder = root.clone();
    for name in path.split('/').filter(|name| !name.is_empty()) {
        folder = match child_folder(vim, &folder, name).await? {
            Some(child) => child,
            None => return error::FolderNotFoundSnafu { folder: path }.fail(),
        };
    }
    Ok(folder)
}

async fn child_folder<V>(
    vim: &V,
    parent: &ManagedObjectReference,
    name: &str,
) -> Result<Option<ManagedObjectReference>>
where
    V: Vim + ?Sized,
{
    let children = vim.children(parent).await.context(error::RemoteSnafu {
        what: "listing folder children",
    })?;
    for child in children.into_iter().filter(|child| child.is_folder()) {
        let child_name = vim.name(&child).await.context(error::RemoteSnafu {
            what: "reading folder name",
        })?;
        if child_name == name {
            return Ok(Some(child));
        }
    }
    Ok(None)
}

/// Whether the entity carries every tag as a custom value.
pub fn has_tags(
    entity: &ManagedEntity,
    fields: &[CustomFieldDef],
    tags: &BTreeMap<String, String>,
) -> bool {
    let values = entity.custom_values(fields);
    tags.iter().all(|(name, value)| {
        values.iter().any(|(found_name, found_value)| {
            *found_name == name.as_str() && *found_value == value.as_str()
        })
    })
}

/// The machines of the machine class by UUID, i.e. the VMs in the folder carrying all tags.
pub async fn list_machines<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
) -> Result<BTreeMap<String, String>>
where
    V: Vim + ?Sized,
{
    let mut machines = BTreeMap::new();
    visit_virtual_machines(vim, spec, |entity, fields| {
        if !has_tags(entity, fields, &spec.tags) {
            return Ok(());
        }
        match &entity.uuid {
            Some(uuid) => {
                machines.insert(uuid.clone(), entity.name.clone());
            }
            None => debug!("Skipping VM '{}' without UUID", entity.name),
        }
        Ok(())
    })
    .await?;
    Ok(machines)
}

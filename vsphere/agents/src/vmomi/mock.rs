//! An in-memory inventory that implements [`Vim`]. Calls that start tasks complete them
//! immediately; the tasks report their outcome through `task_info`.

use super::error::{Error, Result};
use super::types::*;
use super::Vim;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub(crate) const DATACENTER: &str = "dc1";

#[derive(Default)]
struct Inventory {
    paths: HashMap<String, ManagedObjectReference>,
    uuids: HashMap<String, ManagedObjectReference>,
    folders: HashMap<ManagedObjectReference, DatacenterFolders>,
    children: HashMap<ManagedObjectReference, Vec<ManagedObjectReference>>,
    names: HashMap<ManagedObjectReference, String>,
    custom_values: HashMap<ManagedObjectReference, Vec<CustomFieldValue>>,
    power: HashMap<ManagedObjectReference, PowerState>,
    backings: HashMap<ManagedObjectReference, EthernetCardBackingInfo>,
    cards: HashMap<ManagedObjectReference, Vec<VirtualEthernetCard>>,
    pools: HashMap<ManagedObjectReference, ManagedObjectReference>,
    fields: Vec<CustomFieldDef>,
    tasks: HashMap<ManagedObjectReference, TaskInfo>,
    clones: Vec<(String, VirtualMachineCloneSpec)>,
    failing: HashSet<String>,
    vanished: HashSet<ManagedObjectReference>,
    calls: Vec<String>,
    next_id: u32,
}

impl Inventory {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn path_of(&self, object: &ManagedObjectReference) -> Option<String> {
        self.paths
            .iter()
            .find(|(_, found)| *found == object)
            .map(|(path, _)| path.clone())
    }

    fn add_child(
        &mut self,
        parent: &ManagedObjectReference,
        child: ManagedObjectReference,
        name: &str,
    ) {
        if let Some(parent_path) = self.path_of(parent) {
            self.paths
                .insert(format!("{}/{}", parent_path, name), child.clone());
        }
        self.names.insert(child.clone(), name.to_string());
        self.children
            .entry(parent.clone())
            .or_default()
            .push(child);
    }

    /// Records the call and fails it when `name` was marked as failing.
    fn call(&mut self, name: &str, object: &str) -> Result<()> {
        self.calls.push(format!("{} {}", name, object));
        if self.failing.contains(name) {
            return Err(fault(name));
        }
        Ok(())
    }

    fn start_task(&mut self, name: &str, result: Option<Value>) -> ManagedObjectReference {
        let task = ManagedObjectReference::new("Task", self.next("task"));
        let info = if self.failing.contains(&format!("{}:wait", name)) {
            TaskInfo {
                state: TaskState::Error,
                result: None,
                error: Some(LocalizedMethodFault {
                    localized_message: Some(format!("{} failed remotely", name)),
                    fault: None,
                }),
            }
        } else {
            TaskInfo {
                state: TaskState::Success,
                result,
                error: None,
            }
        };
        self.tasks.insert(task.clone(), info);
        task
    }

    fn remove(&mut self, object: &ManagedObjectReference) {
        self.paths.retain(|_, found| found != object);
        self.uuids.retain(|_, found| found != object);
        for children in self.children.values_mut() {
            children.retain(|child| child != object);
        }
        self.power.remove(object);
    }
}

fn fault(name: &str) -> Error {
    Error::Fault {
        method: "POST",
        path: name.to_string(),
        status: 500,
        fault: "SystemError".to_string(),
        message: "injected failure".to_string(),
    }
}

fn missing(object: &ManagedObjectReference, property: &str) -> Error {
    Error::MissingProperty {
        object: object.to_string(),
        property: property.to_string(),
    }
}

pub(crate) struct MockVim {
    inventory: Mutex<Inventory>,
}

impl MockVim {
    /// An inventory with the datacenter `dc1` and its four root folders.
    pub(crate) fn new() -> Self {
        let mut inventory = Inventory::default();
        let datacenter = ManagedObjectReference::new("Datacenter", "datacenter-1");
        let folders = DatacenterFolders {
            vm_folder: ManagedObjectReference::new("Folder", "group-v1"),
            host_folder: ManagedObjectReference::new("Folder", "group-h1"),
            datastore_folder: ManagedObjectReference::new("Folder", "group-s1"),
            network_folder: ManagedObjectReference::new("Folder", "group-n1"),
        };
        inventory
            .paths
            .insert(format!("/{}", DATACENTER), datacenter.clone());
        inventory
            .names
            .insert(datacenter.clone(), DATACENTER.to_string());
        for (folder, name) in [
            (&folders.vm_folder, "vm"),
            (&folders.host_folder, "host"),
            (&folders.datastore_folder, "datastore"),
            (&folders.network_folder, "network"),
        ] {
            inventory.add_child(&datacenter, folder.clone(), name);
        }
        inventory.folders.insert(datacenter, folders);
        Self {
            inventory: Mutex::new(inventory),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inventory) -> T) -> T {
        let mut inventory = self.inventory.lock().unwrap();
        f(&mut inventory)
    }

    pub(crate) fn datacenter(&self) -> ManagedObjectReference {
        self.with(|inventory| inventory.paths[&format!("/{}", DATACENTER)].clone())
    }

    pub(crate) fn root_folders(&self) -> DatacenterFolders {
        let datacenter = self.datacenter();
        self.with(|inventory| inventory.folders[&datacenter].clone())
    }

    pub(crate) fn add_folder(
        &self,
        parent: &ManagedObjectReference,
        name: &str,
    ) -> ManagedObjectReference {
        self.with(|inventory| {
            let folder = ManagedObjectReference::new("Folder", inventory.next("group"));
            inventory.add_child(parent, folder.clone(), name);
            folder
        })
    }

    pub(crate) fn add_vm(
        &self,
        folder: &ManagedObjectReference,
        name: &str,
        uuid: &str,
        power: PowerState,
    ) -> ManagedObjectReference {
        self.with(|inventory| {
            let vm = ManagedObjectReference::new("VirtualMachine", inventory.next("vm"));
            inventory.add_child(folder, vm.clone(), name);
            inventory.uuids.insert(uuid.to_string(), vm.clone());
            inventory.power.insert(vm.clone(), power);
            vm
        })
    }

    pub(crate) fn add_object(
        &self,
        parent: &ManagedObjectReference,
        kind: &str,
        name: &str,
    ) -> ManagedObjectReference {
        self.with(|inventory| {
            let object = ManagedObjectReference::new(kind, inventory.next(&kind.to_lowercase()));
            inventory.add_child(parent, object.clone(), name);
            object
        })
    }

    pub(crate) fn add_network(
        &self,
        folder: &ManagedObjectReference,
        kind: &str,
        name: &str,
        backing: EthernetCardBackingInfo,
    ) -> ManagedObjectReference {
        let network = self.add_object(folder, kind, name);
        self.with(|inventory| inventory.backings.insert(network.clone(), backing));
        network
    }

    pub(crate) fn add_card(&self, vm: &ManagedObjectReference, card: VirtualEthernetCard) {
        self.with(|inventory| inventory.cards.entry(vm.clone()).or_default().push(card));
    }

    pub(crate) fn set_pool(
        &self,
        object: &ManagedObjectReference,
        pool: &ManagedObjectReference,
    ) {
        self.with(|inventory| inventory.pools.insert(object.clone(), pool.clone()));
    }

    pub(crate) fn add_field(&self, key: i32, name: &str) {
        self.with(|inventory| {
            inventory.fields.push(CustomFieldDef {
                key,
                name: name.to_string(),
                managed_object_type: Some("VirtualMachine".to_string()),
            })
        });
    }

    pub(crate) fn set_value(&self, object: &ManagedObjectReference, key: i32, value: &str) {
        self.with(|inventory| {
            let values = inventory.custom_values.entry(object.clone()).or_default();
            values.retain(|existing| existing.key != key);
            values.push(CustomFieldValue {
                key,
                value: Some(value.to_string()),
            });
        });
    }

    /// Makes calls named `name` fail. `<name>:wait` makes the task started by `name` fail.
    pub(crate) fn fail(&self, name: &str) {
        self.with(|inventory| inventory.failing.insert(name.to_string()));
    }

    /// Leaves `object` out of property retrievals, as if it was removed after being listed.
    pub(crate) fn vanish(&self, object: &ManagedObjectReference) {
        self.with(|inventory| inventory.vanished.insert(object.clone()));
    }

    pub(crate) fn recover(&self, name: &str) {
        self.with(|inventory| inventory.failing.remove(name));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.with(|inventory| inventory.calls.clone())
    }

    pub(crate) fn clones(&self) -> Vec<(String, VirtualMachineCloneSpec)> {
        self.with(|inventory| inventory.clones.clone())
    }

    pub(crate) fn power(&self, vm: &ManagedObjectReference) -> Option<PowerState> {
        self.with(|inventory| inventory.power.get(vm).copied())
    }

    pub(crate) fn custom_value(&self, vm: &ManagedObjectReference, name: &str) -> Option<String> {
        self.with(|inventory| {
            let key = inventory.fields.iter().find(|field| field.name == name)?.key;
            inventory
                .custom_values
                .get(vm)?
                .iter()
                .find(|value| value.key == key)?
                .value
                .clone()
        })
    }

    pub(crate) fn lookup(&self, path: &str) -> Option<ManagedObjectReference> {
        self.with(|inventory| inventory.paths.get(path).cloned())
    }
}

#[async_trait::async_trait]
impl Vim for MockVim {
    async fn find_by_inventory_path(&self, path: &str) -> Result<Option<ManagedObjectReference>> {
        self.with(|inventory| {
            inventory.call("FindByInventoryPath", path)?;
            Ok(inventory.paths.get(path).cloned())
        })
    }

    async fn find_vm_by_uuid(
        &self,
        _datacenter: &ManagedObjectReference,
        uuid: &str,
    ) -> Result<Option<ManagedObjectReference>> {
        self.with(|inventory| {
            inventory.call("FindByUuid", uuid)?;
            Ok(inventory.uuids.get(uuid).cloned())
        })
    }

    async fn folders(&self, datacenter: &ManagedObjectReference) -> Result<DatacenterFolders> {
        self.with(|inventory| {
            inventory.call("folders", &datacenter.value)?;
            inventory
                .folders
                .get(datacenter)
                .cloned()
                .ok_or_else(|| missing(datacenter, "vmFolder"))
        })
    }

    async fn children(
        &self,
        folder: &ManagedObjectReference,
    ) -> Result<Vec<ManagedObjectReference>> {
        self.with(|inventory| {
            inventory.call("childEntity", &folder.value)?;
            Ok(inventory.children.get(folder).cloned().unwrap_or_default())
        })
    }

    async fn name(&self, object: &ManagedObjectReference) -> Result<String> {
        self.with(|inventory| {
            inventory.call("name", &object.value)?;
            inventory
                .names
                .get(object)
                .cloned()
                .ok_or_else(|| missing(object, "name"))
        })
    }

    async fn retrieve_entities(
        &self,
        objects: &[ManagedObjectReference],
    ) -> Result<Vec<ManagedEntity>> {
        self.with(|inventory| {
            inventory.call("RetrievePropertiesEx", &objects.len().to_string())?;
            // The property collector does not promise any order.
            let mut entities: Vec<ManagedEntity> = objects
                .iter()
                .filter(|object| !inventory.vanished.contains(*object))
                .map(|object| ManagedEntity {
                    self_ref: object.clone(),
                    name: inventory.names.get(object).cloned().unwrap_or_default(),
                    custom_value: inventory
                        .custom_values
                        .get(object)
                        .cloned()
                        .unwrap_or_default(),
                    uuid: inventory
                        .uuids
                        .iter()
                        .find(|(_, vm)| *vm == object)
                        .map(|(uuid, _)| uuid.clone()),
                })
                .collect();
            entities.reverse();
            Ok(entities)
        })
    }

    async fn power_state(&self, vm: &ManagedObjectReference) -> Result<PowerState> {
        self.with(|inventory| {
            inventory.call("runtime", &vm.value)?;
            inventory
                .power
                .get(vm)
                .copied()
                .ok_or_else(|| missing(vm, "runtime"))
        })
    }

    async fn vm_uuid(&self, vm: &ManagedObjectReference) -> Result<String> {
        self.with(|inventory| {
            inventory.call("config.uuid", &vm.value)?;
            inventory
                .uuids
                .iter()
                .find(|(_, found)| *found == vm)
                .map(|(uuid, _)| uuid.clone())
                .ok_or_else(|| missing(vm, "config"))
        })
    }

    async fn power_off(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.with(|inventory| {
            inventory.call("PowerOffVM_Task", &vm.value)?;
            inventory.power.insert(vm.clone(), PowerState::PoweredOff);
            Ok(inventory.start_task("PowerOffVM_Task", None))
        })
    }

    async fn power_on(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.with(|inventory| {
            inventory.call("PowerOnVM_Task", &vm.value)?;
            inventory.power.insert(vm.clone(), PowerState::PoweredOn);
            Ok(inventory.start_task("PowerOnVM_Task", None))
        })
    }

    async fn destroy(&self, object: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.with(|inventory| {
            inventory.call("Destroy_Task", &object.value)?;
            inventory.remove(object);
            Ok(inventory.start_task("Destroy_Task", None))
        })
    }

    async fn clone_vm(
        &self,
        template: &ManagedObjectReference,
        folder: &ManagedObjectReference,
        name: &str,
        spec: &VirtualMachineCloneSpec,
    ) -> Result<ManagedObjectReference> {
        self.with(|inventory| {
            inventory.call("CloneVM_Task", &template.value)?;
            inventory.clones.push((name.to_string(), spec.clone()));
            let vm = ManagedObjectReference::new("VirtualMachine", inventory.next("vm"));
            inventory.add_child(folder, vm.clone(), name);
            inventory
                .uuids
                .insert(format!("uuid-{}", name), vm.clone());
            inventory.power.insert(vm.clone(), PowerState::PoweredOff);
            let result = serde_json::to_value(&vm).ok();
            Ok(inventory.start_task("CloneVM_Task", result))
        })
    }

    async fn task_info(&self, task: &ManagedObjectReference) -> Result<TaskInfo> {
        self.with(|inventory| {
            inventory
                .tasks
                .get(task)
                .cloned()
                .ok_or_else(|| missing(task, "info"))
        })
    }

    async fn custom_fields(&self) -> Result<Vec<CustomFieldDef>> {
        self.with(|inventory| {
            inventory.call("field", "")?;
            Ok(inventory.fields.clone())
        })
    }

    async fn add_custom_field(&self, name: &str, mo_type: &str) -> Result<CustomFieldDef> {
        self.with(|inventory| {
            inventory.call("AddCustomFieldDef", name)?;
            let field = CustomFieldDef {
                key: inventory.fields.iter().map(|f| f.key).max().unwrap_or(100) + 1,
                name: name.to_string(),
                managed_object_type: Some(mo_type.to_string()),
            };
            inventory.fields.push(field.clone());
            Ok(field)
        })
    }

    async fn set_custom_value(
        &self,
        object: &ManagedObjectReference,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let field_key = self.with(|inventory| {
            inventory.call("setCustomValue", key)?;
            inventory
                .fields
                .iter()
                .find(|field| field.name == key)
                .map(|field| field.key)
                .ok_or_else(|| fault("setCustomValue"))
        })?;
        self.set_value(object, field_key, value);
        Ok(())
    }

    async fn network_backing(
        &self,
        network: &ManagedObjectReference,
    ) -> Result<EthernetCardBackingInfo> {
        self.with(|inventory| {
            inventory.call("backing", &network.value)?;
            inventory
                .backings
                .get(network)
                .cloned()
                .ok_or_else(|| missing(network, "config"))
        })
    }

    async fn ethernet_cards(&self, vm: &ManagedObjectReference) -> Result<Vec<VirtualEthernetCard>> {
        self.with(|inventory| {
            inventory.call("config.hardware.device", &vm.value)?;
            Ok(inventory.cards.get(vm).cloned().unwrap_or_default())
        })
    }

    async fn resource_pool(
        &self,
        object: &ManagedObjectReference,
    ) -> Result<ManagedObjectReference> {
        self.with(|inventory| {
            inventory.call("resourcePool", &object.value)?;
            inventory
                .pools
                .get(object)
                .cloned()
                .ok_or_else(|| missing(object, "resourcePool"))
        })
    }

    async fn logout(&self) -> Result<()> {
        self.with(|inventory| inventory.call("Logout", ""))
    }
}

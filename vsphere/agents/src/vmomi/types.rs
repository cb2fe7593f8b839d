//! The subset of the vim25 data objects that the driver reads and writes, in their VI/JSON shape.
//! Every data object carries its type in `_typeName`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Names a remote object, e.g. `VirtualMachine:vm-42`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(tag = "_typeName", rename = "ManagedObjectReference")]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new<S1, S2>(kind: S1, value: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn is_virtual_machine(&self) -> bool {
        self.kind == "VirtualMachine"
    }

    pub fn is_folder(&self) -> bool {
        self.kind == "Folder"
    }

    pub fn is_network(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "Network" | "DistributedVirtualPortgroup" | "OpaqueNetwork"
        )
    }
}

impl Display for ManagedObjectReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// The references that `ServiceInstance.content` hands out.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub search_index: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
    pub custom_fields_manager: Option<ManagedObjectReference>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskState {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Error)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedMethodFault {
    #[serde(default)]
    pub localized_message: Option<String>,
    #[serde(default)]
    pub fault: Option<Value>,
}

impl LocalizedMethodFault {
    /// The localized message, or the fault type when the server sent no message.
    pub fn message(&self) -> String {
        if let Some(message) = self.localized_message.as_ref().filter(|m| !m.is_empty()) {
            return message.clone();
        }
        self.fault
            .as_ref()
            .and_then(|fault| fault.get("_typeName"))
            .and_then(|name| name.as_str())
            .unwrap_or("unknown fault")
            .to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub state: TaskState,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<LocalizedMethodFault>,
}

/// A custom field definition of the custom fields manager.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDef {
    pub key: i32,
    pub name: String,
    #[serde(default)]
    pub managed_object_type: Option<String>,
}

/// A custom value of an entity, keyed by the [`CustomFieldDef`] key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub key: i32,
    #[serde(default)]
    pub value: Option<String>,
}

/// The properties of a VM that the visitor retrieves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagedEntity {
    pub self_ref: ManagedObjectReference,
    pub name: String,
    pub custom_value: Vec<CustomFieldValue>,
    /// `config.uuid`, absent while a VM is being created.
    pub uuid: Option<String>,
}

impl ManagedEntity {
    /// The entity's custom values by field name.
    pub fn custom_values<'a>(&'a self, fields: &'a [CustomFieldDef]) -> Vec<(&'a str, &'a str)> {
        self.custom_value
            .iter()
            .filter_map(|value| {
                let field = fields.iter().find(|field| field.key == value.key)?;
                Some((field.name.as_str(), value.value.as_deref()?))
            })
            .collect()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatacenterFolders {
    pub vm_folder: ManagedObjectReference,
    pub host_folder: ManagedObjectReference,
    pub datastore_folder: ManagedObjectReference,
    pub network_folder: ManagedObjectReference,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "_typeName",
    rename = "DistributedVirtualSwitchPortConnection",
    rename_all = "camelCase"
)]
pub struct DistributedVirtualSwitchPortConnection {
    pub switch_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portgroup_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_key: Option<String>,
}

/// How an ethernet card connects to a network.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_typeName")]
pub enum EthernetCardBackingInfo {
    #[serde(
        rename = "VirtualEthernetCardNetworkBackingInfo",
        rename_all = "camelCase"
    )]
    Network {
        device_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network: Option<ManagedObjectReference>,
    },
    #[serde(rename = "VirtualEthernetCardDistributedVirtualPortBackingInfo")]
    DistributedVirtualPort {
        port: DistributedVirtualSwitchPortConnection,
    },
    #[serde(
        rename = "VirtualEthernetCardOpaqueNetworkBackingInfo",
        rename_all = "camelCase"
    )]
    OpaqueNetwork {
        opaque_network_id: String,
        opaque_network_type: String,
    },
    /// A backing of a template's card that the driver does not create. It is always replaced
    /// before the card is sent back.
    #[serde(other)]
    Unsupported,
}

impl EthernetCardBackingInfo {
    /// The distributed switch of a port group backing.
    pub fn switch_uuid(&self) -> Option<&str> {
        match self {
            EthernetCardBackingInfo::DistributedVirtualPort { port } => Some(&port.switch_uuid),
            _ => None,
        }
    }
}

/// The `_typeName` of every ethernet card device.
pub const ETHERNET_CARD_TYPES: &[&str] = &[
    "VirtualE1000",
    "VirtualE1000e",
    "VirtualPCNet32",
    "VirtualSriovEthernetCard",
    "VirtualVmxnet",
    "VirtualVmxnet2",
    "VirtualVmxnet3",
    "VirtualVmxnet3Vrdma",
];

/// An ethernet card device. Properties the driver does not touch are kept in `other` so that an
/// existing card can be edited and sent back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualEthernetCard {
    #[serde(rename = "_typeName")]
    pub type_name: String,
    pub key: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing: Option<EthernetCardBackingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOperation {
    Add,
    Edit,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_typeName", rename = "VirtualDeviceConfigSpec")]
pub struct VirtualDeviceConfigSpec {
    pub operation: DeviceOperation,
    pub device: VirtualEthernetCard,
}

/// A `string` typed `anyType` value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_typeName", rename = "string")]
pub struct StringValue {
    #[serde(rename = "_value")]
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_typeName", rename = "OptionValue")]
pub struct OptionValue {
    pub key: String,
    pub value: StringValue,
}

impl OptionValue {
    pub fn new<S1, S2>(key: S1, value: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            key: key.into(),
            value: StringValue {
                value: value.into(),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_typeName", rename = "VirtualMachineConfigSpec")]
pub struct VirtualMachineConfigSpec {
    #[serde(rename = "numCPUs", skip_serializing_if = "Option::is_none")]
    pub num_cpus: Option<u32>,
    #[serde(rename = "memoryMB", skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    #[serde(rename = "guestId", skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
    #[serde(rename = "extraConfig", default, skip_serializing_if = "Vec::is_empty")]
    pub extra_config: Vec<OptionValue>,
    #[serde(rename = "deviceChange", default, skip_serializing_if = "Vec::is_empty")]
    pub device_change: Vec<VirtualDeviceConfigSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_typeName", rename = "VirtualMachineRelocateSpec")]
pub struct VirtualMachineRelocateSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<ManagedObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datastore: Option<ManagedObjectReference>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "_typeName",
    rename = "VirtualMachineCloneSpec",
    rename_all = "camelCase"
)]
pub struct VirtualMachineCloneSpec {
    pub location: VirtualMachineRelocateSpec,
    pub template: bool,
    pub power_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<VirtualMachineConfigSpec>,
}

/*!

Creates machines by cloning the template VM of the machine class. The clone gets the configured
CPU, memory, network and extra config, including the boot config that the guest reads at first
boot. It is then tagged with the custom values of the machine class and powered on.

!*/

use crate::error::{self, Result};
use crate::find::{datacenter, find_object, find_vm};
use crate::ignition::{ignition_file, IgnitionConfig};
use crate::lifecycle::power_on;
use crate::network::NetworkSelector;
use crate::userdata::prepare_user_data;
use crate::vmomi::{
    self, DeviceOperation, ManagedObjectReference, OptionValue, PowerState,
    VirtualDeviceConfigSpec, VirtualMachineCloneSpec, VirtualMachineConfigSpec,
    VirtualMachineRelocateSpec, Vim,
};
use agent_utils::base64_encode;
use log::{debug, info};
use snafu::ResultExt;
use vsphere_types::{BootConfigFormat, VsphereProviderSpec};

const GUESTINFO_USERDATA: &str = "guestinfo.userdata";
const GUESTINFO_IGNITION: &str = "guestinfo.coreos.config.data";
const ENCODING_SUFFIX: &str = ".encoding";
const ENCODING_BASE64: &str = "base64";
const VIRTUAL_MACHINE_TYPE: &str = "VirtualMachine";

/// Creates the machine's VM unless it exists already. An existing VM is tagged and powered on,
/// which completes a create that failed after the clone. Returns the UUID of the VM.
pub async fn create_vm<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    user_data: &str,
) -> Result<String>
where
    V: Vim + ?Sized,
{
    match find_vm(vim, spec, machine_name, None).await {
        Ok(vm) => {
            info!("VM '{}' already exists", machine_name);
            start_vm(vim, spec, &vm, machine_name).await?;
            return vim.vm_uuid(&vm).await.context(error::UuidSnafu);
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let boot_config = boot_extra_config(spec, machine_name, user_data)?;
    let vm = clone_vm(vim, spec, machine_name, boot_config).await?;
    vim.vm_uuid(&vm).await.context(error::UuidSnafu)
}

/// The extra config entries that hand the boot config to the guest.
pub fn boot_extra_config(
    spec: &VsphereProviderSpec,
    machine_name: &str,
    user_data: &str,
) -> Result<Vec<OptionValue>> {
    let (key, data) = match spec.boot_config {
        BootConfigFormat::CloudInit => (
            GUESTINFO_USERDATA,
            prepare_user_data(user_data, &spec.ssh_keys)?,
        ),
        BootConfigFormat::Ignition => (
            GUESTINFO_IGNITION,
            ignition_file(&IgnitionConfig {
                passwd_hash: spec.ignition_passwd_hash.clone().unwrap_or_default(),
                hostname: machine_name.to_string(),
                ssh_keys: spec.ssh_keys.clone(),
                userdata_base64: base64_encode(user_data),
                install_path: spec.ignition_install_path().to_string(),
            }),
        ),
    };
    Ok(vec![
        OptionValue::new(key, base64_encode(data)),
        OptionValue::new(format!("{}{}", key, ENCODING_SUFFIX), ENCODING_BASE64),
    ])
}

/// Clones the template into the machine class folder, tags the clone and powers it on.
pub async fn clone_vm<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    machine_name: &str,
    boot_config: Vec<OptionValue>,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    let datacenter = datacenter(vim, spec).await?;
    let folder = match spec.folder() {
        Some(folder) => find_object(vim, spec, "vm", "folder", folder).await?,
        None => {
            vim.folders(&datacenter)
                .await
                .context(error::RemoteSnafu {
                    what: "reading datacenter folders",
                })?
                .vm_folder
        }
    };
    let template = find_object(vim, spec, "vm", "template", &spec.template_vm).await?;
    let pool = resource_pool(vim, spec, &template).await?;
    let datastore = match spec.datastore.as_deref().filter(|d| !d.is_empty()) {
        Some(datastore) => Some(find_object(vim, spec, "datastore", "datastore", datastore).await?),
        None => None,
    };

    let clone_spec = VirtualMachineCloneSpec {
        location: VirtualMachineRelocateSpec {
            pool: Some(pool),
            datastore,
        },
        template: false,
        power_on: false,
        config: Some(VirtualMachineConfigSpec {
            num_cpus: Some(spec.num_cpus),
            memory_mb: Some(spec.memory),
            guest_id: spec.guest_id.clone().filter(|g| !g.is_empty()),
            extra_config: spec
                .extra_config
                .iter()
                .map(|(key, value)| OptionValue::new(key, value))
                .chain(boot_config)
                .collect(),
            device_change: vec![network_change(vim, spec, &template).await?],
        }),
    };

    info!("Cloning '{}' into VM '{}'", spec.template_vm, machine_name);
    let task = vim
        .clone_vm(&template, &folder, machine_name, &clone_spec)
        .await
        .context(error::StartCloneSnafu)?;
    let vm = vmomi::wait_for_reference(vim, &task)
        .await
        .context(error::CloneSnafu)?;
    debug!("Cloned VM '{}' is {}", machine_name, vm);

    start_vm(vim, spec, &vm, machine_name).await?;
    Ok(vm)
}

/// Tags the VM and powers it on unless it is running already.
async fn start_vm<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    vm: &ManagedObjectReference,
    machine_name: &str,
) -> Result<()>
where
    V: Vim + ?Sized,
{
    set_tags(vim, spec, vm).await?;
    let power_state = vim.power_state(vm).await.context(error::PowerStateSnafu)?;
    if power_state != PowerState::PoweredOn {
        power_on(vim, vm, machine_name).await?;
    }
    Ok(())
}

/// The pool the clone is placed in: the configured resource pool, the root pool of the
/// configured compute cluster, or the pool of the template.
async fn resource_pool<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    template: &ManagedObjectReference,
) -> Result<ManagedObjectReference>
where
    V: Vim + ?Sized,
{
    if let Some(pool) = spec.resource_pool.as_deref().filter(|p| !p.is_empty()) {
        return find_object(vim, spec, "host", "resource pool", pool).await;
    }
    let owner = match spec.compute_cluster.as_deref().filter(|c| !c.is_empty()) {
        Some(cluster) => find_object(vim, spec, "host", "compute cluster", cluster).await?,
        None => template.clone(),
    };
    vim.resource_pool(&owner).await.context(error::RemoteSnafu {
        what: format!("reading resource pool of {}", owner),
    })
}

/// Connects the first card of the template to the network, or adds a card if there is none.
async fn network_change<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    template: &ManagedObjectReference,
) -> Result<VirtualDeviceConfigSpec>
where
    V: Vim + ?Sized,
{
    let selector = NetworkSelector::new(spec);
    let device = selector.device(vim, spec).await?;
    let cards = vim
        .ethernet_cards(template)
        .await
        .context(error::RemoteSnafu {
            what: "reading template devices",
        })?;
    Ok(match cards.into_iter().next() {
        Some(mut current) => {
            NetworkSelector::change(&mut current, &device);
            VirtualDeviceConfigSpec {
                operation: DeviceOperation::Edit,
                device: current,
            }
        }
        None => VirtualDeviceConfigSpec {
            operation: DeviceOperation::Add,
            device,
        },
    })
}

/// Sets every tag as a custom value, defining the custom fields that do not exist yet.
async fn set_tags<V>(
    vim: &V,
    spec: &VsphereProviderSpec,
    vm: &ManagedObjectReference,
) -> Result<()>
where
    V: Vim + ?Sized,
{
    if spec.tags.is_empty() {
        return Ok(());
    }
    let mut fields = vim.custom_fields().await.context(error::FieldSnafu)?;
    for (name, value) in &spec.tags {
        if !fields.iter().any(|field| &field.name == name) {
            debug!("Adding custom field '{}'", name);
            let field = vim
                .add_custom_field(name, VIRTUAL_MACHINE_TYPE)
                .await
                .context(error::CustomValueSnafu { name })?;
            fields.push(field);
        }
        vim.set_custom_value(vm, name, value)
            .await
            .context(error::CustomValueSnafu { name })?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vmomi::mock::MockVim;
    use crate::vmomi::{EthernetCardBackingInfo, VirtualEthernetCard};
    use agent_utils::base64_decode_to_string;
    use serde_json::Map;

    fn spec() -> VsphereProviderSpec {
        let mut spec = VsphereProviderSpec {
            datacenter: "dc1".to_string(),
            folder: Some("shoot".to_string()),
            network: "VM Network".to_string(),
            template_vm: "templates/ubuntu".to_string(),
            compute_cluster: Some("cluster1".to_string()),
            num_cpus: 2,
            memory: 4096,
            ssh_keys: vec!["ssh1".to_string()],
            ..Default::default()
        };
        spec.extra_config
            .insert("disk.enableUUID".to_string(), "TRUE".to_string());
        spec.tags
            .insert("cluster".to_string(), "shoot--dev".to_string());
        spec.tags.insert("role".to_string(), "node".to_string());
        spec
    }

    struct Inventory {
        vim: MockVim,
        template: ManagedObjectReference,
        cluster_pool: ManagedObjectReference,
    }

    fn inventory() -> Inventory {
        let vim = MockVim::new();
        let folders = vim.root_folders();
        vim.add_folder(&folders.vm_folder, "shoot");
        let templates = vim.add_folder(&folders.vm_folder, "templates");
        let template = vim.add_vm(&templates, "ubuntu", "uuid-template", PowerState::PoweredOff);
        vim.add_card(
            &template,
            VirtualEthernetCard {
                type_name: "VirtualVmxnet3".to_string(),
                key: 4000,
                backing: Some(EthernetCardBackingInfo::Network {
                    device_name: "old".to_string(),
                    network: None,
                }),
                address_type: Some("assigned".to_string()),
                mac_address: Some("00:50:56:00:00:01".to_string()),
                other: Map::new(),
            },
        );
        let template_pool = vim.add_object(&folders.host_folder, "ResourcePool", "template-pool");
        vim.set_pool(&template, &template_pool);
        let cluster = vim.add_object(&folders.host_folder, "ClusterComputeResource", "cluster1");
        let cluster_pool = vim.add_object(&cluster, "ResourcePool", "Resources");
        vim.set_pool(&cluster, &cluster_pool);
        vim.add_object(&folders.datastore_folder, "Datastore", "ds1");
        vim.add_network(
            &folders.network_folder,
            "Network",
            "VM Network",
            EthernetCardBackingInfo::Network {
                device_name: "VM Network".to_string(),
                network: None,
            },
        );
        vim.add_field(101, "cluster");
        Inventory {
            vim,
            template,
            cluster_pool,
        }
    }

    fn extra_config(clone_spec: &VirtualMachineCloneSpec, key: &str) -> Option<String> {
        clone_spec
            .config
            .as_ref()?
            .extra_config
            .iter()
            .find(|option| option.key == key)
            .map(|option| option.value.value.clone())
    }

    #[tokio::test]
    async fn create_clones_template() {
        let Inventory {
            vim,
            template,
            cluster_pool,
        } = inventory();
        let uuid = create_vm(&vim, &spec(), "m1", "#cloud-config\n")
            .await
            .unwrap();
        assert_eq!(uuid, "uuid-m1");

        let vm = vim.lookup("/dc1/vm/shoot/m1").unwrap();
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOn));
        assert_eq!(vim.custom_value(&vm, "cluster").as_deref(), Some("shoot--dev"));
        assert_eq!(vim.custom_value(&vm, "role").as_deref(), Some("node"));
        assert!(vim.calls().contains(&"AddCustomFieldDef role".to_string()));
        assert!(!vim.calls().contains(&"AddCustomFieldDef cluster".to_string()));
        assert!(vim
            .calls()
            .contains(&format!("CloneVM_Task {}", template.value)));

        let clones = vim.clones();
        assert_eq!(clones.len(), 1);
        let (name, clone_spec) = &clones[0];
        assert_eq!(name, "m1");
        assert_eq!(clone_spec.location.pool.as_ref(), Some(&cluster_pool));
        assert_eq!(clone_spec.location.datastore, None);
        assert!(!clone_spec.power_on);

        let config = clone_spec.config.as_ref().unwrap();
        assert_eq!(config.num_cpus, Some(2));
        assert_eq!(config.memory_mb, Some(4096));
        assert_eq!(config.device_change.len(), 1);
        let change = &config.device_change[0];
        assert_eq!(change.operation, DeviceOperation::Edit);
        assert_eq!(change.device.key, 4000);
        assert_eq!(
            change.device.backing,
            Some(EthernetCardBackingInfo::Network {
                device_name: "VM Network".to_string(),
                network: None,
            })
        );

        assert_eq!(
            extra_config(clone_spec, "disk.enableUUID").as_deref(),
            Some("TRUE")
        );
        assert_eq!(
            extra_config(clone_spec, "guestinfo.userdata.encoding").as_deref(),
            Some("base64")
        );
        let user_data =
            base64_decode_to_string(&extra_config(clone_spec, "guestinfo.userdata").unwrap())
                .unwrap();
        assert_eq!(
            user_data,
            "#cloud-config\n\nssh_authorized_keys:\n- \"ssh1\"\n"
        );
    }

    #[tokio::test]
    async fn existing_vm_is_returned() {
        let Inventory { vim, .. } = inventory();
        let shoot = vim.lookup("/dc1/vm/shoot").unwrap();
        let vm = vim.add_vm(&shoot, "m1", "uuid-existing", PowerState::PoweredOff);
        let uuid = create_vm(&vim, &spec(), "m1", "#cloud-config\n")
            .await
            .unwrap();
        assert_eq!(uuid, "uuid-existing");
        assert!(vim.clones().is_empty());
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOn));
        assert_eq!(vim.custom_value(&vm, "role").as_deref(), Some("node"));
    }

    #[tokio::test]
    async fn running_vm_is_not_powered_on() {
        let Inventory { vim, .. } = inventory();
        let shoot = vim.lookup("/dc1/vm/shoot").unwrap();
        let vm = vim.add_vm(&shoot, "m1", "uuid-existing", PowerState::PoweredOn);
        create_vm(&vim, &spec(), "m1", "").await.unwrap();
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOn));
        assert!(vim.calls().iter().all(|call| !call.starts_with("PowerOnVM_Task")));
    }

    #[tokio::test]
    async fn retry_completes_failed_power_on() {
        let Inventory { vim, .. } = inventory();
        vim.fail("PowerOnVM_Task");
        let error = create_vm(&vim, &spec(), "m1", "").await.unwrap_err();
        assert!(error.to_string().starts_with("starting PowerOn failed"));
        let vm = vim.lookup("/dc1/vm/shoot/m1").unwrap();
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOff));

        vim.recover("PowerOnVM_Task");
        let uuid = create_vm(&vim, &spec(), "m1", "").await.unwrap();
        assert_eq!(uuid, "uuid-m1");
        assert_eq!(vim.clones().len(), 1);
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOn));
    }

    #[tokio::test]
    async fn retry_completes_failed_tagging() {
        let Inventory { vim, .. } = inventory();
        vim.fail("setCustomValue");
        create_vm(&vim, &spec(), "m1", "").await.unwrap_err();
        let vm = vim.lookup("/dc1/vm/shoot/m1").unwrap();
        assert_eq!(vim.custom_value(&vm, "cluster"), None);
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOff));

        vim.recover("setCustomValue");
        create_vm(&vim, &spec(), "m1", "").await.unwrap();
        assert_eq!(vim.clones().len(), 1);
        assert_eq!(vim.custom_value(&vm, "cluster").as_deref(), Some("shoot--dev"));
        assert_eq!(vim.power(&vm), Some(PowerState::PoweredOn));
    }

    #[tokio::test]
    async fn placement_and_added_card() {
        let vim = MockVim::new();
        let folders = vim.root_folders();
        let template = vim.add_vm(
            &folders.vm_folder,
            "template",
            "uuid-template",
            PowerState::PoweredOff,
        );
        let pool = vim.add_object(&folders.host_folder, "ResourcePool", "pool1");
        let datastore = vim.add_object(&folders.datastore_folder, "Datastore", "ds1");
        vim.add_network(
            &folders.network_folder,
            "Network",
            "VM Network",
            EthernetCardBackingInfo::Network {
                device_name: "VM Network".to_string(),
                network: None,
            },
        );
        let spec = VsphereProviderSpec {
            datacenter: "dc1".to_string(),
            network: "VM Network".to_string(),
            template_vm: "template".to_string(),
            resource_pool: Some("pool1".to_string()),
            datastore: Some("ds1".to_string()),
            num_cpus: 1,
            memory: 1024,
            ..Default::default()
        };
        let vm = clone_vm(&vim, &spec, "m1", Vec::new()).await.unwrap();
        assert_eq!(vim.lookup("/dc1/vm/m1"), Some(vm));

        let (_, clone_spec) = vim.clones().remove(0);
        assert_eq!(clone_spec.location.pool, Some(pool));
        assert_eq!(clone_spec.location.datastore, Some(datastore));
        let config = clone_spec.config.unwrap();
        let change = &config.device_change[0];
        assert_eq!(change.operation, DeviceOperation::Add);
        assert_eq!(change.device.key, -1);
        assert!(vim.calls().iter().all(|call| !call.starts_with("field")));
        assert!(vim
            .calls()
            .iter()
            .all(|call| *call != format!("resourcePool {}", template.value)));
    }

    #[tokio::test]
    async fn missing_template() {
        let Inventory { vim, .. } = inventory();
        let spec = VsphereProviderSpec {
            template_vm: "absent".to_string(),
            ..spec()
        };
        let error = create_vm(&vim, &spec, "m1", "").await.unwrap_err();
        assert_eq!(error.to_string(), "template '/dc1/vm/absent' not found");
    }

    #[tokio::test]
    async fn clone_failures_are_wrapped() {
        for (failing, message) in [
            ("CloneVM_Task", "starting Clone failed"),
            ("CloneVM_Task:wait", "Clone failed"),
            ("setCustomValue", "Setting custom value 'cluster' failed"),
            ("PowerOnVM_Task:wait", "PowerOn failed"),
        ] {
            let Inventory { vim, .. } = inventory();
            vim.fail(failing);
            let error = create_vm(&vim, &spec(), "m1", "").await.unwrap_err();
            assert!(
                error.to_string().starts_with(message),
                "'{}' does not start with '{}'",
                error,
                message
            );
        }
    }

    #[test]
    fn ignition_boot_config() {
        let spec = VsphereProviderSpec {
            boot_config: BootConfigFormat::Ignition,
            ignition_passwd_hash: Some("hash".to_string()),
            ..spec()
        };
        let options = boot_extra_config(&spec, "m1", "user data").unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].key, "guestinfo.coreos.config.data");
        assert_eq!(options[1].key, "guestinfo.coreos.config.data.encoding");
        assert_eq!(options[1].value.value, "base64");

        let ignition = base64_decode_to_string(&options[0].value.value).unwrap();
        let value: serde_json::Value = serde_json::from_str(&ignition).unwrap();
        assert_eq!(value["passwd"]["users"][0]["passwordHash"], "hash");
        assert_eq!(
            value["passwd"]["users"][0]["sshAuthorizedKeys"],
            serde_json::json!(["ssh1"])
        );
        assert_eq!(
            value["storage"]["files"][0]["contents"]["source"],
            "data:,m1"
        );
        assert_eq!(
            value["storage"]["files"][1]["contents"]["source"],
            format!(
                "data:text/plain;charset=utf-8;base64,{}",
                base64_encode("user data")
            )
        );
        assert_eq!(
            value["storage"]["files"][1]["path"],
            "/var/lib/coreos-install/user_data"
        );
    }

    #[test]
    fn conflicting_ssh_keys() {
        let user_data = "#cloud-config\nssh_authorized_keys: []\n";
        let error = boot_extra_config(&spec(), "m1", user_data).unwrap_err();
        assert!(matches!(error, error::Error::SshKeysPresent));
    }
}

/*!

Resolves the network of a machine class into the ethernet card that connects a VM to it.

A network name may match several networks, typically port groups of the same name on different
distributed switches. The switch UUID of the machine class then selects one of them.

!*/

use crate::error::{self, Result};
use crate::find::{datacenter, find_object};
use crate::vmomi::{EthernetCardBackingInfo, ManagedObjectReference, VirtualEthernetCard, Vim};
use log::debug;
use serde_json::Map;
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeMap;
use vsphere_types::{VsphereProviderSpec, DEFAULT_NETWORK_ADAPTER};

const ADDRESS_TYPE_GENERATED: &str = "generated";
const ADDRESS_TYPE_MANUAL: &str = "manual";

/// Selects a network and describes the card to attach to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkSelector {
    /// The network name, or an inventory path when it contains a `/`.
    pub name: String,
    /// Picks among several networks of the same name.
    pub switch_uuid: Option<String>,
    /// The card type, e.g. `vmxnet3` or `e1000e`.
    pub adapter: String,
    /// A fixed MAC address. The address is generated when unset.
    pub address: Option<String>,
}

impl NetworkSelector {
    pub fn new(spec: &VsphereProviderSpec) -> Self {
        Self {
            name: spec.network.clone(),
            switch_uuid: spec.switch_uuid().map(String::from),
            adapter: DEFAULT_NETWORK_ADAPTER.to_string(),
            address: None,
        }
    }

    /// Finds the network. Exactly one network must match, unless the switch UUID picks one of
    /// several distributed port groups.
    pub async fn network<V>(
        &self,
        vim: &V,
        spec: &VsphereProviderSpec,
    ) -> Result<ManagedObjectReference>
    where
        V: Vim + ?Sized,
    {
        let mut networks = self.list(vim, spec).await?;
        ensure!(
            !networks.is_empty(),
            error::NetworkNotFoundSnafu { name: &self.name }
        );
        if networks.len() == 1 {
            return Ok(networks.remove(0));
        }

        let switch_uuid = self
            .switch_uuid
            .as_deref()
            .context(error::AmbiguousNetworkSnafu { name: &self.name })?;

        let mut found = BTreeMap::new();
        for network in networks {
            let backing = self.backing(vim, &network).await?;
            if let Some(uuid) = backing.switch_uuid() {
                found.insert(network.value.clone(), uuid.to_string());
                if uuid == switch_uuid {
                    debug!("Switch '{}' selects '{}'", switch_uuid, network);
                    return Ok(network);
                }
            }
        }
        error::SwitchUuidMismatchSnafu {
            name: &self.name,
            switch_uuids: found
                .iter()
                .map(|(network, uuid)| format!("{}:{}", network, uuid))
                .collect::<Vec<_>>()
                .join(", "),
        }
        .fail()
    }

    /// A new ethernet card for the network.
    pub async fn device<V>(&self, vim: &V, spec: &VsphereProviderSpec) -> Result<VirtualEthernetCard>
    where
        V: Vim + ?Sized,
    {
        let type_name = card_type(&self.adapter).context(error::UnknownAdapterSnafu {
            adapter: &self.adapter,
        })?;
        let network = self.network(vim, spec).await?;
        let backing = self.backing(vim, &network).await?;

        let mut card = VirtualEthernetCard {
            type_name: type_name.to_string(),
            key: -1,
            backing: Some(backing),
            address_type: Some(ADDRESS_TYPE_GENERATED.to_string()),
            mac_address: None,
            other: Map::new(),
        };
        if let Some(address) = self.address.as_ref().filter(|a| !a.is_empty()) {
            card.address_type = Some(ADDRESS_TYPE_MANUAL.to_string());
            card.mac_address = Some(address.clone());
        }
        Ok(card)
    }

    /// Applies the backing and hardware address of `update` to the existing card `current`.
    pub fn change(current: &mut VirtualEthernetCard, update: &VirtualEthernetCard) {
        current.backing = update.backing.clone();
        if let Some(mac_address) = update.mac_address.as_ref().filter(|m| !m.is_empty()) {
            current.mac_address = Some(mac_address.clone());
        }
        if let Some(address_type) = update.address_type.as_ref().filter(|a| !a.is_empty()) {
            current.address_type = Some(address_type.clone());
        }
    }

    async fn backing<V>(
        &self,
        vim: &V,
        network: &ManagedObjectReference,
    ) -> Result<EthernetCardBackingInfo>
    where
        V: Vim + ?Sized,
    {
        vim.network_backing(network)
            .await
            .context(error::RemoteSnafu {
                what: format!("reading backing of {}", network),
            })
    }

    /// All networks matching the name. A path yields at most one network.
    async fn list<V>(
        &self,
        vim: &V,
        spec: &VsphereProviderSpec,
    ) -> Result<Vec<ManagedObjectReference>>
    where
        V: Vim + ?Sized,
    {
        if self.name.contains('/') {
            let network = find_object(vim, spec, "network", "network", &self.name).await;
            return match network {
                Ok(network) if network.is_network() => Ok(vec![network]),
                Ok(_) | Err(error::Error::ObjectNotFound { .. }) => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        let datacenter = datacenter(vim, spec).await?;
        let folders = vim.folders(&datacenter).await.context(error::RemoteSnafu {
            what: "reading datacenter folders",
        })?;
        let mut networks = Vec::new();
        let mut pending = vec![folders.network_folder];
        while let Some(folder) = pending.pop() {
            let children = vim.children(&folder).await.context(error::RemoteSnafu {
                what: "listing network folder",
            })?;
            for child in children {
                if child.is_folder() {
                    pending.push(child);
                } else if child.is_network() {
                    let name = vim.name(&child).await.context(error::RemoteSnafu {
                        what: "reading network name",
                    })?;
                    if name == self.name {
                        networks.push(child);
                    }
                }
            }
        }
        Ok(networks)
    }
}

/// The device type of an adapter name.
fn card_type(adapter: &str) -> Option<&'static str> {
    match adapter {
        "e1000" => Some("VirtualE1000"),
        "e1000e" => Some("VirtualE1000e"),
        "pcnet32" => Some("VirtualPCNet32"),
        "sriov" => Some("VirtualSriovEthernetCard"),
        "vmxnet" => Some("VirtualVmxnet"),
        "vmxnet2" => Some("VirtualVmxnet2"),
        "vmxnet3" => Some("VirtualVmxnet3"),
        "vmxnet3vrdma" => Some("VirtualVmxnet3Vrdma"),
        _ => None,
    }
}

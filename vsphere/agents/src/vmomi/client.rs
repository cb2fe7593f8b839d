use super::error::{self, Result};
use super::types::*;
use super::Vim;
use log::{debug, trace};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use snafu::{OptionExt, ResultExt};
use url::Url;

/// The vim25 release whose VI/JSON binding is used.
pub const DEFAULT_API_RELEASE: &str = "8.0.1.0";

const SESSION_HEADER: &str = "vmware-api-session-id";

/// A logged in VI/JSON session.
#[derive(Debug)]
pub struct VimClient {
    http: Client,
    base: String,
    session: String,
    content: ServiceContent,
}

/// The VI/JSON base URL for `host`, which is either a host name or a URL. `https` is assumed when
/// no scheme is given.
pub fn sdk_url(host: &str, release: &str) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    let url = if host.contains("://") {
        format!("{}/sdk/vim25/{}", host, release)
    } else {
        format!("https://{}/sdk/vim25/{}", host, release)
    };
    Url::parse(&url).context(error::InvalidUrlSnafu { url })
}

impl VimClient {
    /// Reads the service content and logs in.
    pub async fn connect(
        sdk_url: &Url,
        username: &str,
        password: &str,
        insecure_ssl: bool,
    ) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(insecure_ssl)
            .build()
            .context(error::ClientBuildSnafu)?;
        let base = sdk_url.as_str().trim_end_matches('/').to_string();

        let path = "ServiceInstance/ServiceInstance/content".to_string();
        let response = execute(http.get(format!("{}/{}", base, path)), "GET", &path).await?;
        let content = read_json(response, &path)
            .await?
            .context(error::MissingPropertySnafu {
                object: "ServiceInstance",
                property: "content",
            })?;
        let content: ServiceContent = parse(content, &path)?;

        let path = format!(
            "{}/{}/Login",
            content.session_manager.kind, content.session_manager.value
        );
        let request = http
            .post(format!("{}/{}", base, path))
            .json(&json!({ "userName": username, "password": password }));
        let response = execute(request, "POST", &path).await?;
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .context(error::MissingSessionSnafu)?
            .to_string();
        debug!("Logged in to '{}' as '{}'", base, username);

        Ok(Self {
            http,
            base,
            session,
            content,
        })
    }

    pub fn service_content(&self) -> &ServiceContent {
        &self.content
    }

    async fn get(&self, object: &ManagedObjectReference, property: &str) -> Result<Option<Value>> {
        let path = format!("{}/{}/{}", object.kind, object.value, property);
        trace!("GET {}", path);
        let request = self
            .http
            .get(format!("{}/{}", self.base, path))
            .header(SESSION_HEADER, &self.session);
        read_json(execute(request, "GET", &path).await?, &path).await
    }

    async fn get_as<T>(&self, object: &ManagedObjectReference, property: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.get(object, property).await?;
        required(value, object, property)
    }

    async fn invoke(
        &self,
        object: &ManagedObjectReference,
        method: &str,
        body: Value,
    ) -> Result<Option<Value>> {
        let path = format!("{}/{}/{}", object.kind, object.value, method);
        trace!("POST {}", path);
        let request = self
            .http
            .post(format!("{}/{}", self.base, path))
            .header(SESSION_HEADER, &self.session)
            .json(&body);
        read_json(execute(request, "POST", &path).await?, &path).await
    }

    async fn invoke_as<T>(
        &self,
        object: &ManagedObjectReference,
        method: &str,
        body: Value,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.invoke(object, method, body).await?;
        required(value, object, method)
    }

    fn custom_fields_manager(&self) -> Result<&ManagedObjectReference> {
        self.content
            .custom_fields_manager
            .as_ref()
            .context(error::MissingPropertySnafu {
                object: "ServiceContent",
                property: "customFieldsManager",
            })
    }
}

#[async_trait::async_trait]
impl Vim for VimClient {
    async fn find_by_inventory_path(&self, path: &str) -> Result<Option<ManagedObjectReference>> {
        let found = self
            .invoke(
                &self.content.search_index,
                "FindByInventoryPath",
                json!({ "inventoryPath": path }),
            )
            .await?;
        found.map(|value| parse(value, "FindByInventoryPath")).transpose()
    }

    async fn find_vm_by_uuid(
        &self,
        datacenter: &ManagedObjectReference,
        uuid: &str,
    ) -> Result<Option<ManagedObjectReference>> {
        let found = self
            .invoke(
                &self.content.search_index,
                "FindByUuid",
                json!({ "datacenter": datacenter, "uuid": uuid, "vmSearch": true }),
            )
            .await?;
        found.map(|value| parse(value, "FindByUuid")).transpose()
    }

    async fn folders(&self, datacenter: &ManagedObjectReference) -> Result<DatacenterFolders> {
        Ok(DatacenterFolders {
            vm_folder: self.get_as(datacenter, "vmFolder").await?,
            host_folder: self.get_as(datacenter, "hostFolder").await?,
            datastore_folder: self.get_as(datacenter, "datastoreFolder").await?,
            network_folder: self.get_as(datacenter, "networkFolder").await?,
        })
    }

    async fn children(
        &self,
        folder: &ManagedObjectReference,
    ) -> Result<Vec<ManagedObjectReference>> {
        match self.get(folder, "childEntity").await? {
            Some(value) => parse(value, "childEntity"),
            None => Ok(Vec::new()),
        }
    }

    async fn name(&self, object: &ManagedObjectReference) -> Result<String> {
        self.get_as(object, "name").await
    }

    async fn retrieve_entities(
        &self,
        objects: &[ManagedObjectReference],
    ) -> Result<Vec<ManagedEntity>> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let object_set: Vec<Value> = objects
            .iter()
            .map(|object| json!({ "_typeName": "ObjectSpec", "obj": object }))
            .collect();
        let body = json!({
            "specSet": [{
                "_typeName": "PropertyFilterSpec",
                "propSet": [{
                    "_typeName": "PropertySpec",
                    "type": "VirtualMachine",
                    "pathSet": ["name", "customValue", "config.uuid"]
                }],
                "objectSet": object_set
            }],
            "options": { "_typeName": "RetrieveOptions" }
        });
        let collector = &self.content.property_collector;
        let mut entities = Vec::with_capacity(objects.len());
        let mut result = self.invoke(collector, "RetrievePropertiesEx", body).await?;
        while let Some(value) = result {
            let page: RetrieveResult = parse(value, "RetrievePropertiesEx")?;
            for object in page.objects {
                entities.push(object.into_entity()?);
            }
            result = match page.token {
                Some(token) => {
                    self.invoke(
                        collector,
                        "ContinueRetrievePropertiesEx",
                        json!({ "token": token }),
                    )
                    .await?
                }
                None => None,
            };
        }
        Ok(entities)
    }

    async fn power_state(&self, vm: &ManagedObjectReference) -> Result<PowerState> {
        let runtime: RuntimeInfo = self.get_as(vm, "runtime").await?;
        Ok(runtime.power_state)
    }

    async fn vm_uuid(&self, vm: &ManagedObjectReference) -> Result<String> {
        let config: ConfigInfo = self.get_as(vm, "config").await?;
        Ok(config.uuid)
    }

    async fn power_off(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.invoke_as(vm, "PowerOffVM_Task", json!({})).await
    }

    async fn power_on(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.invoke_as(vm, "PowerOnVM_Task", json!({})).await
    }

    async fn destroy(&self, object: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.invoke_as(object, "Destroy_Task", json!({})).await
    }

    async fn clone_vm(
        &self,
        template: &ManagedObjectReference,
        folder: &ManagedObjectReference,
        name: &str,
        spec: &VirtualMachineCloneSpec,
    ) -> Result<ManagedObjectReference> {
        self.invoke_as(
            template,
            "CloneVM_Task",
            json!({ "folder": folder, "name": name, "spec": spec }),
        )
        .await
    }

    async fn task_info(&self, task: &ManagedObjectReference) -> Result<TaskInfo> {
        self.get_as(task, "info").await
    }

    async fn custom_fields(&self) -> Result<Vec<CustomFieldDef>> {
        match self.get(self.custom_fields_manager()?, "field").await? {
            Some(value) => parse(value, "field"),
            None => Ok(Vec::new()),
        }
    }

    async fn add_custom_field(&self, name: &str, mo_type: &str) -> Result<CustomFieldDef> {
        self.invoke_as(
            self.custom_fields_manager()?,
            "AddCustomFieldDef",
            json!({ "name": name, "moType": mo_type }),
        )
        .await
    }

    async fn set_custom_value(
        &self,
        object: &ManagedObjectReference,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.invoke(object, "setCustomValue", json!({ "key": key, "value": value }))
            .await?;
        Ok(())
    }

    async fn network_backing(
        &self,
        network: &ManagedObjectReference,
    ) -> Result<EthernetCardBackingInfo> {
        match network.kind.as_str() {
            "Network" => Ok(EthernetCardBackingInfo::Network {
                device_name: self.name(network).await?,
                network: Some(network.clone()),
            }),
            "DistributedVirtualPortgroup" => {
                let config: PortgroupConfig = self.get_as(network, "config").await?;
                let switch_uuid: String =
                    self.get_as(&config.distributed_virtual_switch, "uuid").await?;
                Ok(EthernetCardBackingInfo::DistributedVirtualPort {
                    port: DistributedVirtualSwitchPortConnection {
                        switch_uuid,
                        portgroup_key: Some(config.key),
                        port_key: None,
                    },
                })
            }
            "OpaqueNetwork" => {
                let summary: OpaqueNetworkSummary = self.get_as(network, "summary").await?;
                Ok(EthernetCardBackingInfo::OpaqueNetwork {
                    opaque_network_id: summary.opaque_network_id,
                    opaque_network_type: summary.opaque_network_type,
                })
            }
            _ => error::NotANetworkSnafu {
                object: network.to_string(),
            }
            .fail(),
        }
    }

    async fn ethernet_cards(&self, vm: &ManagedObjectReference) -> Result<Vec<VirtualEthernetCard>> {
        let config: Value = self.get_as(vm, "config").await?;
        let devices = config
            .pointer("/hardware/device")
            .and_then(|devices| devices.as_array())
            .context(error::MissingPropertySnafu {
                object: vm.to_string(),
                property: "config.hardware.device",
            })?;
        devices
            .iter()
            .filter(|device| {
                device
                    .get("_typeName")
                    .and_then(|name| name.as_str())
                    .map(|name| ETHERNET_CARD_TYPES.contains(&name))
                    .unwrap_or(false)
            })
            .map(|device| parse(device.clone(), "config.hardware.device"))
            .collect()
    }

    async fn resource_pool(
        &self,
        object: &ManagedObjectReference,
    ) -> Result<ManagedObjectReference> {
        self.get_as(object, "resourcePool").await
    }

    async fn logout(&self) -> Result<()> {
        self.invoke(&self.content.session_manager, "Logout", json!({}))
            .await?;
        Ok(())
    }
}

/// Sends the request and turns an unsuccessful response into a fault.
async fn execute(request: RequestBuilder, method: &'static str, path: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .context(error::HttpSnafu { method, path })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response
        .text()
        .await
        .context(error::HttpSnafu { method, path })?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let fault = body
        .get("_typeName")
        .and_then(|name| name.as_str())
        .or_else(|| status.canonical_reason())
        .unwrap_or("unknown fault")
        .to_string();
    let message = ["message", "localizedMessage"]
        .iter()
        .find_map(|key| body.get(key).and_then(|message| message.as_str()))
        .or_else(|| {
            body.pointer("/faultMessage/0/message")
                .and_then(|message| message.as_str())
        })
        .map(String::from)
        .unwrap_or_else(|| text.trim().to_string());
    error::FaultSnafu {
        method,
        path,
        status: status.as_u16(),
        fault,
        message,
    }
    .fail()
}

/// The JSON body of a response, `None` for an empty or `null` body.
async fn read_json(response: Response, path: &str) -> Result<Option<Value>> {
    let text = response.text().await.context(error::HttpSnafu {
        method: "read",
        path,
    })?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(&text).context(error::DeserializeSnafu { path })?;
    Ok(Some(value).filter(|value| !value.is_null()))
}

fn parse<T>(value: Value, path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).context(error::DeserializeSnafu { path })
}

fn required<T>(value: Option<Value>, object: &ManagedObjectReference, property: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let value = value.context(error::MissingPropertySnafu {
        object: object.to_string(),
        property,
    })?;
    parse(value, property)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeInfo {
    power_state: PowerState,
}

#[derive(Deserialize)]
struct ConfigInfo {
    uuid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortgroupConfig {
    key: String,
    distributed_virtual_switch: ManagedObjectReference,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpaqueNetworkSummary {
    opaque_network_id: String,
    opaque_network_type: String,
}

#[derive(Deserialize)]
struct RetrieveResult {
    #[serde(default)]
    objects: Vec<ObjectContent>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectContent {
    obj: ManagedObjectReference,
    #[serde(default)]
    prop_set: Vec<DynamicProperty>,
}

#[derive(Deserialize)]
struct DynamicProperty {
    name: String,
    val: Value,
}

impl ObjectContent {
    fn into_entity(self) -> Result<ManagedEntity> {
        let mut name = None;
        let mut custom_value = Vec::new();
        let mut uuid = None;
        for property in self.prop_set {
            // Property values are `anyType`, i.e. wrapped in `{"_typeName", "_value"}`.
            let value = match property.val {
                Value::Object(mut object) if object.contains_key("_value") => {
                    object.remove("_value").unwrap_or(Value::Null)
                }
                other => other,
            };
            match property.name.as_str() {
                "name" => name = Some(parse::<String>(value, "name")?),
                "customValue" => custom_value = parse(value, "customValue")?,
                "config.uuid" => uuid = Some(parse::<String>(value, "config.uuid")?),
                _ => {}
            }
        }
        Ok(ManagedEntity {
            name: name.context(error::MissingPropertySnafu {
                object: self.obj.to_string(),
                property: "name",
            })?,
            self_ref: self.obj,
            custom_value,
            uuid,
        })
    }
}

#[cfg(test)]
mod test {
    use super::sdk_url;

    #[test]
    fn sdk_urls() {
        assert_eq!(
            sdk_url("vcenter.example.com", "8.0.1.0").unwrap().as_str(),
            "https://vcenter.example.com/sdk/vim25/8.0.1.0"
        );
        assert_eq!(
            sdk_url("http://127.0.0.1:1234/", "8.0.1.0").unwrap().as_str(),
            "http://127.0.0.1:1234/sdk/vim25/8.0.1.0"
        );
        assert!(sdk_url("http://[::1", "8.0.1.0").is_err());
    }
}

use agent_common::secrets::SecretData;
use machine_agent::clients::{ClientResult, SecretClient};
use machine_agent::BootstrapData;
use machine_model::SecretName;
use std::collections::BTreeMap;

/// Create a [`SecretClient`] that serves a fixed secret so that we can test without mounted
/// secrets.
pub(crate) struct MockSecretClient {}

#[async_trait::async_trait]
impl SecretClient for MockSecretClient {
    async fn new(_data: BootstrapData) -> ClientResult<Self> {
        Ok(Self {})
    }

    async fn get_secret(&self, secret_name: &SecretName) -> ClientResult<SecretData> {
        let mut values = BTreeMap::new();
        values.insert("userData".to_string(), b"#cloud-config\n".to_vec());
        Ok(SecretData::new(secret_name.clone(), values))
    }
}

/*!

This test module provides mock implementations of the [`AgentClient`] and [`SecretClient`] that
demonstrate what can be done to test without mounted secrets or spec files.

Also provided here is a very simple mock implementation of the [`Driver`] trait.

!*/

pub(crate) mod agent_client;
pub(crate) mod secret_client;

use machine_agent::clients::SecretClient;
use machine_agent::provider::{
    DeletedMachine, Driver, ErrorCode, IntoProviderError, MachineInfo, MachineList,
    MachineRequest, ProviderResult, Spec,
};
use machine_agent::Configuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    pub datacenter: String,
}

impl Configuration for MockConfig {}

/// MachineDriver pretends to manage a fixed set of machines for the sake of demonstrating a mock
/// test.
pub(crate) struct MachineDriver {
    machines: BTreeMap<String, String>,
}

impl MachineDriver {
    pub(crate) fn new() -> Self {
        let mut machines = BTreeMap::new();
        machines.insert("uuid-existing".to_string(), "existing".to_string());
        machines.insert("uuid-other".to_string(), "other".to_string());
        Self { machines }
    }

    fn find(&self, request: &MachineRequest<MockConfig>) -> ProviderResult<MachineInfo> {
        self.machines
            .iter()
            .find(|(id, name)| match request.machine_id() {
                Some(machine_id) => *id == machine_id,
                None => **name == request.machine_name,
            })
            .map(|(id, name)| MachineInfo {
                machine_id: id.to_owned(),
                node_name: name.to_owned(),
            })
            .context(
                ErrorCode::NotFound,
                format!("machine '{}' not found", request.machine_name),
            )
    }
}

#[async_trait::async_trait]
impl Driver for MachineDriver {
    type Config = MockConfig;

    async fn create_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient,
    {
        let secret = client
            .get_secret(&request.spec.secret_name)
            .await
            .context(ErrorCode::Internal, "Unable to read secret")?;
        secret
            .string("userData")
            .context(ErrorCode::InvalidArgument, "Secret has no user data")?;
        match self.find(&request) {
            Ok(info) => Ok(info),
            Err(_) => Ok(MachineInfo {
                machine_id: format!("uuid-{}", request.machine_name),
                node_name: request.machine_name,
            }),
        }
    }

    async fn delete_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        _client: &I,
    ) -> ProviderResult<DeletedMachine>
    where
        I: SecretClient,
    {
        match self.find(&request) {
            Ok(info) => Ok(DeletedMachine {
                machine_id: Some(info.machine_id),
            }),
            Err(e) if e.is_not_found() => Ok(DeletedMachine { machine_id: None }),
            Err(e) => Err(e),
        }
    }

    async fn shutdown_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        _client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient,
    {
        self.find(&request)
    }

    async fn get_machine_status<I>(
        &self,
        request: MachineRequest<Self::Config>,
        _client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient,
    {
        self.find(&request)
    }

    async fn list_machines<I>(
        &self,
        spec: Spec<Self::Config>,
        _client: &I,
    ) -> ProviderResult<MachineList>
    where
        I: SecretClient,
    {
        assert_eq!(spec.configuration.datacenter, "dc1");
        Ok(MachineList {
            machines: self.machines.clone(),
        })
    }
}

use agent_common::secrets::SecretData;
use agent_utils::json_display;
use log::{debug, info, warn};
use machine_agent::clients::SecretClient;
use machine_agent::provider::{
    DeletedMachine, Driver, ErrorCode, IntoProviderError, MachineInfo, MachineList,
    MachineRequest, ProviderResult, Spec,
};
use machine_model::SecretName;
use vsphere_agents::vmomi::{Vim, VimClient};
use vsphere_agents::vsphere::Credentials;
use vsphere_agents::{clone, lifecycle, visit};
use vsphere_types::{VsphereProviderSpec, SECRET_KEY_USER_DATA};

/// Manages the VMs of vSphere machine classes. Every operation opens its own vCenter session.
pub(crate) struct VsphereDriver {}

#[async_trait::async_trait]
impl Driver for VsphereDriver {
    type Config = VsphereProviderSpec;

    async fn create_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient,
    {
        debug!("Creating machine:\n{}", json_display(&request));
        let spec = &request.spec.configuration;
        spec.validate_for_create()
            .context(ErrorCode::InvalidArgument, "Invalid provider spec")?;
        let secret = read_secret(client, &request.spec.secret_name).await?;
        let user_data = secret.string(SECRET_KEY_USER_DATA).context(
            ErrorCode::InvalidArgument,
            "The secret does not contain user data",
        )?;

        let vim = connect(&secret).await?;
        let result = clone::create_vm(&vim, spec, &request.machine_name, &user_data).await;
        logout(&vim).await;
        let machine_id = result.map_err(|e| e.into_provider_error("Unable to create machine"))?;

        info!(
            "Machine '{}' has ID '{}'",
            request.machine_name, machine_id
        );
        Ok(MachineInfo {
            machine_id,
            node_name: request.machine_name,
        })
    }

    async fn delete_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<DeletedMachine>
    where
        I: SecretClient,
    {
        let spec = validated(&request.spec)?;
        let secret = read_secret(client, &request.spec.secret_name).await?;

        let vim = connect(&secret).await?;
        let result = lifecycle::delete_machine(
            &vim,
            spec,
            &request.machine_name,
            request.machine_id(),
        )
        .await;
        logout(&vim).await;
        let machine_id = result.map_err(|e| e.into_provider_error("Unable to delete machine"))?;

        Ok(DeletedMachine { machine_id })
    }

    async fn shutdown_machine<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient,
    {
        let spec = validated(&request.spec)?;
        let secret = read_secret(client, &request.spec.secret_name).await?;

        let vim = connect(&secret).await?;
        let result = lifecycle::shutdown_vm(
            &vim,
            spec,
            &request.machine_name,
            request.machine_id(),
        )
        .await;
        logout(&vim).await;
        let machine_id = result.map_err(|e| e.into_provider_error("Unable to shut down machine"))?;

        Ok(MachineInfo {
            machine_id,
            node_name: request.machine_name,
        })
    }

    async fn get_machine_status<I>(
        &self,
        request: MachineRequest<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineInfo>
    where
        I: SecretClient,
    {
        let spec = validated(&request.spec)?;
        let secret = read_secret(client, &request.spec.secret_name).await?;

        let vim = connect(&secret).await?;
        let result = lifecycle::machine_id(
            &vim,
            spec,
            &request.machine_name,
            request.machine_id(),
        )
        .await;
        logout(&vim).await;
        let machine_id = result.map_err(|e| e.into_provider_error("Unable to find machine"))?;

        Ok(MachineInfo {
            machine_id,
            node_name: request.machine_name,
        })
    }

    async fn list_machines<I>(
        &self,
        spec: Spec<Self::Config>,
        client: &I,
    ) -> ProviderResult<MachineList>
    where
        I: SecretClient,
    {
        let configuration = validated(&spec)?;
        let secret = read_secret(client, &spec.secret_name).await?;

        let vim = connect(&secret).await?;
        let result = visit::list_machines(&vim, configuration).await;
        logout(&vim).await;
        let machines = result.map_err(|e| e.into_provider_error("Unable to list machines"))?;

        info!("Found {} machines", machines.len());
        Ok(MachineList { machines })
    }
}

fn validated(spec: &Spec<VsphereProviderSpec>) -> ProviderResult<&VsphereProviderSpec> {
    spec.configuration
        .validate()
        .context(ErrorCode::InvalidArgument, "Invalid provider spec")?;
    Ok(&spec.configuration)
}

async fn read_secret<I>(client: &I, secret_name: &SecretName) -> ProviderResult<SecretData>
where
    I: SecretClient,
{
    client.get_secret(secret_name).await.context(
        ErrorCode::InvalidArgument,
        format!("Unable to read secret '{}'", secret_name),
    )
}

async fn connect(secret: &SecretData) -> ProviderResult<VimClient> {
    Credentials::from_secret(secret)?.connect().await
}

/// Ends the session. The outcome of the operation does not depend on it.
async fn logout(vim: &VimClient) {
    if let Err(e) = vim.logout().await {
        warn!("Unable to log out of vCenter: {}", e);
    }
}

/*!

The `agent` module defines the `Agent` object which provides the end-to-end program of a machine
driver.

!*/

use crate::clients::{AgentClient, SecretClient};
use crate::error::{self, AgentResult};
use crate::provider::{Driver, MachineRequest, ProviderResult, Spec};
use crate::BootstrapData;
use log::error;
use machine_model::{Configuration, MachineAction};
use snafu::ResultExt;
use std::marker::PhantomData;

/// The `Agent` drives the main program of a machine driver. It runs the one action that the
/// controller requested in the [`BootstrapData`] and reports the outcome.
///
/// ## Dependency Injection for Testing
///
/// The `SClient` and `AClient` types are available so that you can inject mock clients and test
/// your code without mounted secrets or provider spec files. In practice you will use the
/// [`DefaultSecretClient`] and [`DefaultAgentClient`].
///
/// ## Your Custom Implementation
///
/// You implement the `Driver` (see [`Driver`]) type to manage machines.
///
pub struct Agent<SClient, AClient, D>
where
    SClient: SecretClient,
    AClient: AgentClient,
    D: Driver,
{
    /// The data that selects the action and the machine.
    data: BootstrapData,

    /// The client that we will pass to the `Driver`.
    secret_client: SClient,

    /// The client that the agent will use.
    agent_client: AClient,

    /// The user's custom `Driver` implementation.
    driver: D,
}

/// The `Types` struct makes specifying the client types a bit easier when constructing the
/// `Agent`.
#[derive(Clone)]
pub struct Types<SClient, AClient>
where
    SClient: SecretClient,
    AClient: AgentClient,
{
    pub secret_client: PhantomData<SClient>,
    pub agent_client: PhantomData<AClient>,
}

impl<SClient, AClient, D> Agent<SClient, AClient, D>
where
    SClient: SecretClient,
    AClient: AgentClient,
    D: Driver,
{
    /// Create a new `Agent` by providing the necessary bootstrapping data, the client types and
    /// the driver.
    pub async fn new(
        _types: Types<SClient, AClient>,
        data: BootstrapData,
        driver: D,
    ) -> AgentResult<Self> {
        // Initialize the clients.
        let action = data.action;
        let agent_client = AClient::new(data.clone())
            .await
            .context(error::ClientSnafu {
                action,
                target: data.target(),
            })?;
        let data = match data.validate() {
            Ok(ok) => ok,
            Err(e) => {
                Self::send_init_error(&agent_client, action, &e.to_string()).await;
                return Err(e).context(error::BootstrapSnafu);
            }
        };
        let secret_client = match SClient::new(data.clone()).await {
            Ok(ok) => ok,
            Err(e) => {
                Self::send_init_error(&agent_client, action, &e.to_string()).await;
                return Err(e).context(error::ClientSnafu {
                    action,
                    target: data.target(),
                });
            }
        };

        Ok(Self {
            data,
            secret_client,
            agent_client,
            driver,
        })
    }

    /// Run the action that was requested when the `Agent` was instantiated.
    pub async fn run(&self) -> AgentResult<()> {
        let spec: Spec<D::Config> = match self.agent_client.get_spec().await {
            Ok(spec) => spec,
            Err(e) => {
                Self::send_init_error(&self.agent_client, self.data.action, &e.to_string())
                    .await;
                return Err(e).context(self.client_context());
            }
        };
        self.agent_client
            .send_starting()
            .await
            .context(self.client_context())?;

        let client = &self.secret_client;
        match self.data.action {
            MachineAction::Create => {
                self.report(self.driver.create_machine(self.request(spec), client).await)
                    .await
            }
            MachineAction::Delete => {
                self.report(self.driver.delete_machine(self.request(spec), client).await)
                    .await
            }
            MachineAction::Shutdown => {
                self.report(
                    self.driver
                        .shutdown_machine(self.request(spec), client)
                        .await,
                )
                .await
            }
            MachineAction::Status => {
                self.report(
                    self.driver
                        .get_machine_status(self.request(spec), client)
                        .await,
                )
                .await
            }
            MachineAction::List => {
                self.report(self.driver.list_machines(spec, client).await)
                    .await
            }
        }
    }

    fn request(&self, spec: Spec<D::Config>) -> MachineRequest<D::Config> {
        MachineRequest {
            machine_name: self.data.machine_name().to_string(),
            machine_id: self.data.machine_id.clone(),
            spec,
        }
    }

    /// Send the driver's result to the controller.
    async fn report<R>(&self, result: ProviderResult<R>) -> AgentResult<()>
    where
        R: Configuration,
    {
        match result {
            Ok(value) => self
                .agent_client
                .send_succeeded(value)
                .await
                .context(self.client_context()),
            Err(e) => {
                if let Err(client_error) = self.agent_client.send_failed(&e).await {
                    error!("Unable to send error to the controller: {}", client_error);
                    error!("The error we failed to send is: {}", e);
                }
                Err(e).context(error::ProviderSnafu {
                    action: self.data.action,
                    target: self.data.target(),
                })
            }
        }
    }

    fn client_context(&self) -> error::ClientSnafu<MachineAction, String> {
        error::ClientSnafu {
            action: self.data.action,
            target: self.data.target(),
        }
    }

    async fn send_init_error(agent_client: &AClient, action: MachineAction, message: &str) {
        if let Err(send_error) = agent_client.send_init_error(action, message).await {
            error!(
                "Unable to send error '{}' to the controller: {}",
                message, send_error
            );
        }
    }
}

/*!

Creates, deletes, powers off and lists vSphere VMs on behalf of the machine-lifecycle controller.
The controller runs the binary once per operation; the outcome is printed to stdout as JSON.

!*/

mod vsphere_driver;

use crate::vsphere_driver::VsphereDriver;
use agent_utils::init_agent_logger;
use clap::Parser;
use log::LevelFilter;
use machine_agent::clients::{DefaultAgentClient, DefaultSecretClient};
use machine_agent::error::AgentResult;
use machine_agent::{Agent, BootstrapData, Types};
use machine_model::constants::{
    ENV_MACHINE_ACTION, ENV_MACHINE_ID, ENV_MACHINE_NAME, ENV_PROVIDER_SPEC_PATH, ENV_SECRETS_DIR,
    ENV_SECRET_NAME, SECRETS_PATH,
};
use machine_model::{MachineAction, SecretName};
use std::marker::PhantomData;
use std::path::PathBuf;

/// The vSphere machine driver. Every flag can also be given as an environment variable.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// The operation to perform [create|delete|shutdown|status|list].
    #[clap(long, env = ENV_MACHINE_ACTION)]
    action: MachineAction,
    /// The machine to operate on. Required for every action but `list`.
    #[clap(long = "machine-name", env = ENV_MACHINE_NAME)]
    machine_name: Option<String>,
    /// The BIOS UUID of the machine's VM, if known.
    #[clap(long = "machine-id", env = ENV_MACHINE_ID)]
    machine_id: Option<String>,
    /// Path to the provider spec of the machine class, in YAML or JSON.
    #[clap(long = "provider-spec", env = ENV_PROVIDER_SPEC_PATH)]
    provider_spec: PathBuf,
    /// The secret holding the vCenter credentials and the user data.
    #[clap(long = "secret-name", env = ENV_SECRET_NAME)]
    secret_name: SecretName,
    /// The directory that secrets are mounted in.
    #[clap(long = "secrets-dir", env = ENV_SECRETS_DIR, default_value = SECRETS_PATH)]
    secrets_dir: PathBuf,
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_agent_logger(env!("CARGO_CRATE_NAME"), Some(args.log_level));
    let data = BootstrapData {
        action: args.action,
        machine_name: args.machine_name,
        machine_id: args.machine_id,
        provider_spec_path: args.provider_spec,
        secret_name: args.secret_name,
        secrets_dir: args.secrets_dir,
    };
    if let Err(e) = run(data).await {
        eprintln!("{}", e);
        std::process::exit(1);
    };
}

async fn run(data: BootstrapData) -> AgentResult<()> {
    let types = Types {
        secret_client: PhantomData::<DefaultSecretClient>::default(),
        agent_client: PhantomData::<DefaultAgentClient>::default(),
    };
    let agent = Agent::new(types, data, VsphereDriver {}).await?;
    agent.run().await
}

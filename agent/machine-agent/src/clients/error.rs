use machine_model::{MachineAction, SecretName};
use snafu::Snafu;
use std::path::PathBuf;

/// The result type returned by [`SecretClient`] and [`AgentClient`] implementations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// The error type returned by [`SecretClient`] and [`AgentClient`] implementations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Unable to read provider spec '{}': {}", path.display(), source))]
    ReadSpec {
        path: PathBuf,
        source: machine_model::Error,
    },

    #[snafu(display("Unable to read secret '{}': {}", secret_name, source))]
    ReadSecret {
        secret_name: SecretName,
        source: agent_common::secrets::Error,
    },

    #[snafu(display("Unable to serialize the result of '{}': {}", action, source))]
    SerializeResult {
        action: MachineAction,
        source: machine_model::Error,
    },

    #[snafu(display("Unable to serialize the report: {}", source))]
    SerializeReport { source: serde_json::Error },

    #[snafu(display("Unable to write the report: {}", source))]
    WriteReport { source: std::io::Error },
}

use crate::bootstrap::BootstrapError;
use crate::clients::ClientError;
use crate::provider::ProviderError;
use machine_model::MachineAction;
use snafu::Snafu;

/// This is the error type returned by an [`Agent`] object. When receiving this error type you will
/// typically want to display it and exit your main function with a non-zero exit code.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AgentError {
    #[snafu(display("Invalid bootstrap data: {}", source))]
    Bootstrap { source: BootstrapError },

    /// Reading the inputs or reporting the outcome failed.
    #[snafu(display("Client error during '{}' of {}: {}", action, target, source))]
    Client {
        action: MachineAction,
        target: String,
        source: ClientError,
    },

    /// The driver failed. The error has been reported to the controller.
    #[snafu(display("'{}' of {} failed: {}", action, target, source))]
    Provider {
        action: MachineAction,
        target: String,
        source: ProviderError,
    },
}

/// The result type returned by an [`Agent`] object.
pub type AgentResult<T> = std::result::Result<T, AgentError>;

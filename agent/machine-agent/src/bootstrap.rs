/*!

The `bootstrap` module defines the data that the controller hands to a driver binary for a single
invocation and checks that it is complete before the [`Agent`] is constructed.

!*/
use machine_model::{MachineAction, SecretName};
use snafu::{ensure, Snafu};
use std::path::PathBuf;

/// The public error type for [`BootstrapData`].
#[derive(Debug, Snafu)]
pub struct BootstrapError(InnerError);

/// The private error type for [`BootstrapData`].
#[derive(Debug, Snafu)]
pub(crate) enum InnerError {
    #[snafu(display("A machine name is required for the '{}' action", action))]
    MissingMachineName { action: MachineAction },
}

/// Data that is passed to the driver binary through flags or its environment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapData {
    /// The action that we should take.
    pub action: MachineAction,
    /// The machine the action applies to. Only `list` works without one.
    pub machine_name: Option<String>,
    /// The provider's ID of the machine, if the controller already knows it.
    pub machine_id: Option<String>,
    /// The file holding the provider spec of the machine class.
    pub provider_spec_path: PathBuf,
    /// The secret holding credentials and user data.
    pub secret_name: SecretName,
    /// The directory that secrets are mounted in.
    pub secrets_dir: PathBuf,
}

impl BootstrapData {
    /// Checks that the data is sufficient for the action.
    pub fn validate(self) -> Result<BootstrapData, BootstrapError> {
        let has_name = self
            .machine_name
            .as_ref()
            .map(|name| !name.is_empty())
            .unwrap_or(false);
        ensure!(
            has_name || !self.action.needs_machine_name(),
            MissingMachineNameSnafu {
                action: self.action
            }
        );
        Ok(self)
    }

    /// The machine name, or an empty string for actions that do not address a machine.
    pub fn machine_name(&self) -> &str {
        self.machine_name.as_deref().unwrap_or_default()
    }

    /// What the action applies to, for messages.
    pub fn target(&self) -> String {
        match self.machine_name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => format!("machine '{}'", name),
            None => "the machine class".to_string(),
        }
    }
}

use serde::{Deserialize, Serialize};

/// The operation that the machine-lifecycle controller asks a driver to perform. This is not
/// part of any provider spec, but is populated in a flag or an environment variable for the driver
/// binary and is useful for function parameters, etc.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum MachineAction {
    /// Create a machine, or return the existing one with the same name.
    Create,
    /// Power off and destroy a machine.
    Delete,
    /// Power off a machine without destroying it.
    Shutdown,
    /// Look up a machine and report its ID.
    Status,
    /// List all machines that belong to the provider spec.
    List,
}

serde_plain::derive_fromstr_from_deserialize!(MachineAction, |e| -> crate::Error {
    crate::error::OpaqueError::SerdePlain { source: e }.into()
});
serde_plain::derive_display_from_serialize!(MachineAction);

impl MachineAction {
    /// Whether or not the action addresses a single named machine.
    pub fn needs_machine_name(&self) -> bool {
        !matches!(self, MachineAction::List)
    }
}

#[test]
fn parse_actions() {
    use std::str::FromStr;
    assert_eq!(
        MachineAction::from_str("shutdown").unwrap(),
        MachineAction::Shutdown
    );
    assert_eq!(MachineAction::Delete.to_string(), "delete");
    assert!(MachineAction::from_str("destroy").is_err());
    assert!(!MachineAction::List.needs_machine_name());
}

use crate::vmomi;
use machine_agent::provider::{AsErrorCode, ErrorCode, ProviderError};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("machine '{}' not found", name))]
    MachineNotFound { name: String },

    #[snafu(display("machine with id '{}' not found", machine_id))]
    MachineIdNotFound { machine_id: String },

    #[snafu(display("find by inventory path \"{}\" failed: {}", path, source))]
    FindByInventoryPath { path: String, source: vmomi::Error },

    #[snafu(display("find by uuid {} failed: {}", machine_id, source))]
    FindByUuid {
        machine_id: String,
        source: vmomi::Error,
    },

    #[snafu(display("datacenter '{}' not found", datacenter))]
    DatacenterNotFound { datacenter: String },

    #[snafu(display("{} '{}' not found", kind, path))]
    ObjectNotFound { kind: &'static str, path: String },

    #[snafu(display("PowerState failed: {}", source))]
    PowerState { source: vmomi::Error },

    #[snafu(display("starting PowerOff failed: {}", source))]
    StartPowerOff { source: vmomi::Error },

    #[snafu(display("PowerOff failed: {}", source))]
    PowerOff { source: vmomi::Error },

    #[snafu(display("starting Destroy failed: {}", source))]
    StartDestroy { source: vmomi::Error },

    #[snafu(display("Destroy failed: {}", source))]
    Destroy { source: vmomi::Error },

    #[snafu(display("starting PowerOn failed: {}", source))]
    StartPowerOn { source: vmomi::Error },

    #[snafu(display("PowerOn failed: {}", source))]
    PowerOn { source: vmomi::Error },

    #[snafu(display("starting Clone failed: {}", source))]
    StartClone { source: vmomi::Error },

    #[snafu(display("Clone failed: {}", source))]
    Clone { source: vmomi::Error },

    #[snafu(display("UUID failed: {}", source))]
    Uuid { source: vmomi::Error },

    #[snafu(display("Folder {} not found", folder))]
    FolderNotFound { folder: String },

    #[snafu(display("DefaultCollector failed: {}", source))]
    DefaultCollector { source: vmomi::Error },

    #[snafu(display("Field failed: {}", source))]
    Field { source: vmomi::Error },

    #[snafu(display("visiting vm {} failed: {}", name, source))]
    Visit { name: String, source: Box<Error> },

    #[snafu(display("network '{}' not found", name))]
    NetworkNotFound { name: String },

    #[snafu(display(
        "path '{}' resolves to multiple networks. Need switchUuid to select correct network",
        name
    ))]
    AmbiguousNetwork { name: String },

    #[snafu(display(
        "path '{}' resolves to multiple networks. Found these switchUuids: '{}'",
        name,
        switch_uuids
    ))]
    SwitchUuidMismatch { name: String, switch_uuids: String },

    #[snafu(display("unknown ethernet card type '{}'", adapter))]
    UnknownAdapter { adapter: String },

    #[snafu(display("userdata already contains key `ssh_authorized_keys`"))]
    SshKeysPresent,

    #[snafu(display("Setting custom value '{}' failed: {}", name, source))]
    CustomValue { name: String, source: vmomi::Error },

    /// Any other remote call, named by `what`.
    #[snafu(display("{} failed: {}", what, source))]
    Remote {
        what: String,
        source: vmomi::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::MachineNotFound { .. } | Error::MachineIdNotFound { .. }
        )
    }

    /// Reports the error to the controller, keeping its error code.
    pub fn into_provider_error(self, context: &str) -> ProviderError {
        ProviderError::new_with_source_and_context(self.as_error_code(), context, self)
    }
}

impl AsErrorCode for Error {
    fn as_error_code(&self) -> ErrorCode {
        match self {
            Error::MachineNotFound { .. } | Error::MachineIdNotFound { .. } => ErrorCode::NotFound,
            Error::DatacenterNotFound { .. }
            | Error::ObjectNotFound { .. }
            | Error::FolderNotFound { .. }
            | Error::NetworkNotFound { .. }
            | Error::AmbiguousNetwork { .. }
            | Error::SwitchUuidMismatch { .. }
            | Error::UnknownAdapter { .. }
            | Error::SshKeysPresent => ErrorCode::InvalidArgument,
            Error::Visit { source, .. } => source.as_error_code(),
            _ => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn provider_error_codes() {
        let error = Error::MachineNotFound {
            name: "m1".to_string(),
        }
        .into_provider_error("Unable to find machine");
        assert!(error.is_not_found());
        assert_eq!(error.context(), Some("Unable to find machine"));

        let error = Error::Visit {
            name: "m1".to_string(),
            source: Box::new(Error::FolderNotFound {
                folder: "shoot".to_string(),
            }),
        }
        .into_provider_error("Unable to list machines");
        assert_eq!(error.code(), ErrorCode::InvalidArgument);

        let error = Error::SshKeysPresent.into_provider_error("Unable to create machine");
        assert_eq!(error.code(), ErrorCode::InvalidArgument);
    }
}

use super::error::{self, ClientResult};
use crate::BootstrapData;
use agent_common::secrets::{SecretData, SecretsReader};
use machine_model::SecretName;
use snafu::ResultExt;

/// `SecretClient` allows [`Driver`] objects to read the secrets that hold provider credentials and
/// user data.
///
/// This is provided as a trait so that mock implementations can be injected into the [`Agent`] for
/// testing purposes. In practice you will use the [`DefaultSecretClient`].
///
#[async_trait::async_trait]
pub trait SecretClient: Sized + Send + Sync {
    /// Create a new `SecretClient` object.
    async fn new(data: BootstrapData) -> ClientResult<Self>;

    /// Get the key/value pairs of a secret.
    async fn get_secret(&self, secret_name: &SecretName) -> ClientResult<SecretData>;
}

/// Provides the default [`SecretClient`] implementation, which reads secrets that are mounted as
/// directories.
#[derive(Clone, Debug)]
pub struct DefaultSecretClient {
    reader: SecretsReader,
}

#[async_trait::async_trait]
impl SecretClient for DefaultSecretClient {
    async fn new(data: BootstrapData) -> ClientResult<Self> {
        Ok(Self {
            reader: SecretsReader::new_custom_directory(data.secrets_dir),
        })
    }

    async fn get_secret(&self, secret_name: &SecretName) -> ClientResult<SecretData> {
        self.reader
            .get_secret(secret_name)
            .context(error::ReadSecretSnafu {
                secret_name: secret_name.clone(),
            })
    }
}

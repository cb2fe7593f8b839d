/*!

Reads the vCenter credentials from the machine class secret and opens a session with them.

!*/

use crate::vmomi::{sdk_url, VimClient, DEFAULT_API_RELEASE};
use agent_common::secrets::SecretData;
use log::info;
use machine_agent::provider::{ErrorCode, IntoProviderError, ProviderResult};
use vsphere_types::{
    SECRET_KEY_HOST, SECRET_KEY_INSECURE_SSL, SECRET_KEY_PASSWORD, SECRET_KEY_USERNAME,
};

/// The vCenter to connect to.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Skip verification of the vCenter TLS certificate.
    pub insecure_ssl: bool,
}

// The password stays out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("insecure_ssl", &self.insecure_ssl)
            .finish()
    }
}

impl Credentials {
    pub fn from_secret(secret: &SecretData) -> ProviderResult<Self> {
        let insecure_ssl = match secret
            .optional_string(SECRET_KEY_INSECURE_SSL)
            .context(ErrorCode::InvalidArgument, "Unable to read secret")?
        {
            None => false,
            Some(value) => parse_bool(&value).context(
                ErrorCode::InvalidArgument,
                format!(
                    "'{}' must be 'true' or 'false', not '{}'",
                    SECRET_KEY_INSECURE_SSL,
                    value.trim()
                ),
            )?,
        };
        Ok(Self {
            host: required(secret, SECRET_KEY_HOST)?,
            username: required(secret, SECRET_KEY_USERNAME)?,
            password: required(secret, SECRET_KEY_PASSWORD)?,
            insecure_ssl,
        })
    }

    /// Logs in to vCenter. Call [`crate::vmomi::Vim::logout`] on the client when done.
    pub async fn connect(&self) -> ProviderResult<VimClient> {
        let url = sdk_url(&self.host, DEFAULT_API_RELEASE)
            .context(ErrorCode::InvalidArgument, "Invalid vCenter host")?;
        info!("Connecting to '{}' as '{}'", url, self.username);
        VimClient::connect(&url, &self.username, &self.password, self.insecure_ssl)
            .await
            .context(ErrorCode::Internal, "Unable to log in to vCenter")
    }
}

/// A non-empty value of the secret with surrounding whitespace removed.
fn required(secret: &SecretData, key: &str) -> ProviderResult<String> {
    let value = secret
        .string(key)
        .context(ErrorCode::InvalidArgument, "Unable to read secret")?;
    let value = value.trim();
    if value.is_empty() {
        return None.context(
            ErrorCode::InvalidArgument,
            format!("'{}' of secret '{}' is empty", key, secret.name()),
        );
    }
    Ok(value.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

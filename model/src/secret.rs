use crate::error::{self, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The maximum length of a Kubernetes secret name.
const MAX_SECRET_NAME_LEN: usize = 253;

/// The name of an opaque secret holding provider credentials and user data. Secret names become
/// directory names when the secret is mounted, so they are restricted to lowercase alphanumerics,
/// `-` and `.`, which is what Kubernetes allows.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct SecretName(String);

impl SecretName {
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("the name is empty")
        } else if name.len() > MAX_SECRET_NAME_LEN {
            Some("the name is longer than 253 characters")
        } else if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            Some("only lowercase alphanumerics, '-' and '.' are allowed")
        } else if !name.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !name.ends_with(|c: char| c.is_ascii_alphanumeric())
        {
            Some("the name must start and end with an alphanumeric character")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(error::InvalidSecretNameSnafu {
                name,
                reason: reason.to_string(),
            }
            .build()
            .into()),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SecretName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for SecretName {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for SecretName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

#[test]
fn secret_names() {
    assert!(SecretName::new("vsphere-credentials").is_ok());
    assert!(SecretName::new("machine.class-1").is_ok());
    assert!(SecretName::new("").is_err());
    assert!(SecretName::new("Upper").is_err());
    assert!(SecretName::new("-leading").is_err());
    assert!(SecretName::new("a/b").is_err());
    assert!(SecretName::new("x".repeat(254)).is_err());
}

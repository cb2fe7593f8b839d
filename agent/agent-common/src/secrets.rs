use log::debug;
use machine_model::constants::SECRETS_PATH;
use machine_model::SecretName;
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

/// Reads the keys (which become files) and values of a Kubernetes generic/[opaque] secret.
/// [opaque]: https://kubernetes.io/docs/concepts/configuration/secret/#opaque-secrets
#[derive(Debug, Clone)]
pub struct SecretsReader {
    /// The directory where secrets are mounted.
    dir: PathBuf,
}

#[derive(Debug)]
pub struct Error {
    name: SecretName,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(name: SecretName) -> Self {
        Self { name, source: None }
    }

    pub fn new_with_source<E>(name: SecretName, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            name,
            source: Some(source.into()),
        }
    }

    /// The secret that could not be read.
    pub fn secret_name(&self) -> &SecretName {
        &self.name
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            None => write!(f, "Unable to read secret '{}'", self.name),
            Some(e) => write!(f, "Unable to read secret '{}': {}", self.name, e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|some| some.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The key/value pairs of a secret along with the secret's name for error reporting.
#[derive(Debug, Clone)]
pub struct SecretData {
    name: SecretName,
    values: BTreeMap<String, Vec<u8>>,
}

impl SecretData {
    pub fn new(name: SecretName, values: BTreeMap<String, Vec<u8>>) -> Self {
        Self { name, values }
    }

    pub fn get(&self, key: &str) -> Option<&Vec<u8>> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// The name of the secret these values were read from.
    pub fn name(&self) -> &SecretName {
        &self.name
    }

    /// Get the value of `key` as a UTF-8 string.
    pub fn string(&self, key: &str) -> Result<String> {
        self.optional_string(key)?
            .context(error::MissingKeySnafu { key })
            .map_err(|e| self.error(e))
    }

    /// Like [`SecretData::string`] but a missing key is `None` instead of an error.
    pub fn optional_string(&self, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_owned())
                    .context(error::NonUtf8ValueSnafu { key })
                    .map_err(|e| self.error(e))?;
                Ok(Some(value))
            }
        }
    }

    fn error(&self, e: error::ValueError) -> Error {
        Error::new_with_source(self.name.to_owned(), e)
    }
}

impl SecretsReader {
    /// Create a new `SecretsReader` that looks for secrets in the directory where driver
    /// containers have them mounted.
    pub fn new() -> SecretsReader {
        Self {
            dir: PathBuf::from(SECRETS_PATH),
        }
    }

    /// Create a new `SecretsReader` that looks for secrets in a custom directory.
    pub fn new_custom_directory<P>(directory: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            dir: directory.into(),
        }
    }

    /// Get the key/value pairs from a Kubernetes generic/[opaque] secret.
    /// [opaque]: https://kubernetes.io/docs/concepts/configuration/secret/#opaque-secrets
    pub fn get_secret(&self, secret_name: &SecretName) -> Result<SecretData> {
        let mut map = BTreeMap::new();
        let directory = self.dir.join(secret_name.as_str());
        debug!("Reading secret '{}' from '{}'", secret_name, directory.display());
        let read_dir = fs::read_dir(&directory).with_context(|_| error::ListDirectorySnafu {
            name: secret_name.to_owned(),
            directory: &directory,
        })?;
        for entry in read_dir {
            let entry = entry.with_context(|_| error::ListDirectorySnafu {
                name: secret_name.to_owned(),
                directory: &directory,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let key = path
                .file_name()
                .with_context(|| error::MissingFilenameSnafu {
                    name: secret_name.to_owned(),
                    path: &path,
                })?
                .to_str()
                .with_context(|| error::NonUtf8FilenameSnafu {
                    name: secret_name.to_owned(),
                    path: &path,
                })?;
            // Kubernetes mounts secrets through hidden, timestamped directories and symlinks.
            if key.starts_with('.') {
                continue;
            }
            let value = fs::read(&path).with_context(|_| error::ReadFileSnafu {
                name: secret_name.to_owned(),
                path: &path,
            })?;
            map.insert(key.to_string(), value);
        }
        Ok(SecretData::new(secret_name.to_owned(), map))
    }
}

impl Default for SecretsReader {
    fn default() -> Self {
        SecretsReader::new()
    }
}

mod error {
    use machine_model::SecretName;
    use snafu::Snafu;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum OpaqueError {
        #[snafu(display("Unable to list contents of directory '{}': {}", directory.display(), source))]
        ListDirectory {
            name: SecretName,
            directory: PathBuf,
            source: std::io::Error,
        },

        #[snafu(display("Unable to get filename from path '{}'", path.display()))]
        MissingFilename { name: SecretName, path: PathBuf },

        #[snafu(display("Non-UTF8 filename in path '{}'", path.display()))]
        NonUtf8Filename { name: SecretName, path: PathBuf },

        #[snafu(display("Unable to read file '{}': {}", path.display(), source))]
        ReadFile {
            name: SecretName,
            path: PathBuf,
            source: std::io::Error,
        },
    }

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum ValueError {
        #[snafu(display("Key '{}' is missing", key))]
        MissingKey { key: String },

        #[snafu(display("Value of key '{}' is not valid UTF-8: {}", key, source))]
        NonUtf8Value {
            key: String,
            source: std::string::FromUtf8Error,
        },
    }

    impl OpaqueError {
        fn secret_name(&self) -> &SecretName {
            match self {
                OpaqueError::ListDirectory { name, .. } => name,
                OpaqueError::MissingFilename { name, .. } => name,
                OpaqueError::NonUtf8Filename { name, .. } => name,
                OpaqueError::ReadFile { name, .. } => name,
            }
        }
    }

    impl From<OpaqueError> for super::Error {
        fn from(e: OpaqueError) -> Self {
            let name = e.secret_name().to_owned();
            super::Error::new_with_source(name, e)
        }
    }
}

use crate::error::{self, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::fmt::Debug;
use std::path::Path;

/// The `Configuration` trait is for structs that carry provider specific data: the provider spec
/// handed to the driver, and the results the driver hands back to the controller.
///
/// The traits aggregated by the `Configuration` trait are typical of "plain old data" types and
/// provide a way for drivers to strongly type data which the controller treats as opaque.
///
pub trait Configuration:
    Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + Sized + 'static
{
    /// Convert the `Configuration` object to a serde `Map`.
    fn into_map(self) -> Result<Map<String, Value>> {
        match self.into_value()? {
            Value::Object(map) => Ok(map),
            _ => Err(error::ConfigWrongValueTypeSnafu {}.build().into()),
        }
    }

    /// Convert the `Configuration` object to a serde `Value`.
    fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self).context(error::ConfigSerializationSnafu)?)
    }

    /// Deserialize the `Configuration` object from a serde `Value`.
    fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value).context(error::ConfigDeserializationSnafu)?)
    }

    /// Read the `Configuration` object from a file. Files ending in `.json` are parsed as JSON,
    /// everything else as YAML (which also accepts JSON documents).
    fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).context(error::ConfigReadSnafu { path })?;
        let is_json = path
            .extension()
            .map(|extension| extension == "json")
            .unwrap_or(false);
        if is_json {
            Ok(serde_json::from_str(&data).context(error::ConfigDeserializationSnafu)?)
        } else {
            Ok(serde_yaml::from_str(&data).context(error::ConfigYamlSnafu { path })?)
        }
    }
}

// The unit type is a valid configuration for actions that return nothing.
impl Configuration for () {}

/*!

`agent-utils` is a collection of functions that may be used by driver implementations: logger
setup, base64 helpers and JSON display helpers.

!*/

use base64::engine::general_purpose::STANDARD as base64_engine;
use base64::Engine as _;
use constants::{AGENT_CRATES, DEFAULT_AGENT_LEVEL_FILTER};
use env_logger::Builder;
pub use error::Error;
use log::LevelFilter;
use serde::Serialize;
use snafu::ResultExt;
use std::env;

pub mod constants;
mod error;

/// Encode bytes with the standard base64 alphabet and padding.
pub fn base64_encode<T: AsRef<[u8]>>(input: T) -> String {
    base64_engine.encode(input)
}

/// Decode a standard base64 blob into a UTF-8 string.
pub fn base64_decode_to_string(base64_content: &str) -> error::Result<String> {
    let decoded_bytes = base64_engine
        .decode(base64_content.trim().as_bytes())
        .context(error::Base64DecodeSnafu)?;
    String::from_utf8(decoded_bytes).context(error::Utf8DecodeSnafu)
}

/// Extract the value of `RUST_LOG` if it exists, otherwise log this application at
/// `DEFAULT_AGENT_LEVEL_FILTER`.
pub fn init_agent_logger(bin_crate: &str, log_level: Option<LevelFilter>) {
    match env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level except for dependencies.
            let log_level = log_level.unwrap_or(DEFAULT_AGENT_LEVEL_FILTER);
            let mut builder = Builder::new();
            // Set log level to Error for crates other than our own.
            builder
                .filter_level(LevelFilter::Error)
                .filter(Some(bin_crate), log_level);
            // Set all of our crates to the desired level.
            for agent_crate in AGENT_CRATES {
                builder.filter(Some(agent_crate), log_level);
            }
            // Results go to stdout, so logs stay on stderr.
            builder.target(env_logger::Target::Stderr).init();
        }
    }
}

/// Print a value using `serde_json` `to_string_pretty` for types that implement Serialize.
pub fn json_display<T: Serialize>(object: T) -> String {
    serde_json::to_string_pretty(&object).unwrap_or_else(|e| format!("Serialization failed: {}", e))
}

/// Implement `Display` using `serde_json` `to_string_pretty` for types that implement Serialize.
#[macro_export]
macro_rules! impl_display_as_json {
    ($i:ident) => {
        impl std::fmt::Display for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = serde_json::to_string_pretty(self)
                    .unwrap_or_else(|e| format!("Serialization failed: {}", e));
                std::fmt::Display::fmt(&s, f)
            }
        }
    };
}

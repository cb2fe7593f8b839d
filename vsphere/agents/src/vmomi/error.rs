use snafu::Snafu;

/// The error returned by [`Vim`] calls.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Invalid vCenter URL '{}': {}", url, source))]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[snafu(display("Unable to build HTTP client: {}", source))]
    ClientBuild { source: reqwest::Error },

    #[snafu(display("{} '{}' failed: {}", method, path, source))]
    Http {
        method: &'static str,
        path: String,
        source: reqwest::Error,
    },

    /// The server answered with a vim25 fault.
    #[snafu(display("{} '{}' failed with {} ({}): {}", method, path, fault, status, message))]
    Fault {
        method: &'static str,
        path: String,
        status: u16,
        fault: String,
        message: String,
    },

    #[snafu(display("Unable to deserialize the response of '{}': {}", path, source))]
    Deserialize {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display("Login succeeded but the response has no session header"))]
    MissingSession,

    #[snafu(display("Task '{}' failed: {}", task, message))]
    TaskFailed { task: String, message: String },

    #[snafu(display("Task '{}' has no result", task))]
    TaskResult { task: String },

    #[snafu(display("Unable to read the result of task '{}': {}", task, source))]
    TaskResultType {
        task: String,
        source: serde_json::Error,
    },

    #[snafu(display("'{}' has no '{}'", object, property))]
    MissingProperty { object: String, property: String },

    #[snafu(display("'{}' is not a network", object))]
    NotANetwork { object: String },
}

pub type Result<T> = std::result::Result<T, Error>;

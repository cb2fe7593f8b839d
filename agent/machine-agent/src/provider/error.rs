use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// When a [`Driver`] returns an error, it must state what kind of failure occurred so that the
/// controller can decide how to proceed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// The machine does not exist. Callers may treat this as non-fatal, e.g. a machine that is
    /// being deleted is already gone.
    NotFound,

    /// The provider spec or the secret handed to the driver is unusable. Repeating the operation
    /// with the same input will fail again.
    InvalidArgument,

    /// A remote operation failed. The operation that was requested did not complete.
    Internal,
}

/// This is a trait that you can implement for your own types to describe which [`ErrorCode`] an
/// error should carry.
///
/// # Example
///
/// ```
/// use machine_agent::provider::{AsErrorCode, ErrorCode};
/// struct Lookup {
///     found: bool
/// }
/// impl AsErrorCode for Lookup {
///     fn as_error_code(&self) -> ErrorCode {
///         if self.found {
///             ErrorCode::Internal
///         } else {
///             ErrorCode::NotFound
///         }
///     }
/// }
/// ```
///
pub trait AsErrorCode {
    /// Inspects `&self` and determines the error code.
    fn as_error_code(&self) -> ErrorCode;
}

// Implement the trivial case of `AsErrorCode` for the `ErrorCode` enum itself.
impl AsErrorCode for ErrorCode {
    fn as_error_code(&self) -> ErrorCode {
        *self
    }
}

// Implement the trivial case of `AsErrorCode` for a ref to the `ErrorCode` enum itself.
impl AsErrorCode for &ErrorCode {
    fn as_error_code(&self) -> ErrorCode {
        **self
    }
}

/// The error type returned by [`Driver`] implementations.
#[derive(Debug)]
pub struct ProviderError {
    /// What kind of failure occurred.
    code: ErrorCode,

    /// Any message to be included with the error. This will be included in the formatted display
    /// before `inner`.
    context: Option<String>,

    /// The error that caused this error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// The result type returned by [`Driver`] operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new_with_source_and_context<C, S, E>(code: C, context: S, source: E) -> Self
    where
        C: AsErrorCode,
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            code: code.as_error_code(),
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_source<C, E>(code: C, source: E) -> Self
    where
        C: AsErrorCode,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            code: code.as_error_code(),
            context: None,
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<C, S>(code: C, context: S) -> Self
    where
        C: AsErrorCode,
        S: Into<String>,
    {
        Self {
            code: code.as_error_code(),
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())?;
        if let Some(context) = self.context() {
            write!(f, ", {}", context)?;
        }
        if let Some(inner) = self.inner() {
            write!(f, ": {}", inner)?;
        }
        Ok(())
    }
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "The machine was not found",
            ErrorCode::InvalidArgument => "The machine class is invalid",
            ErrorCode::Internal => "The operation failed",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.message(), f)
    }
}

// Make `ProviderError` function as a standard error.
impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A trait that makes it possible to convert error types to `ProviderError` using a familiar
/// `context` function.
pub trait IntoProviderError<T> {
    /// Convert `self` into a `ProviderError`.
    fn context<C, S>(self, code: C, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
        C: AsErrorCode;
}

// Implement `IntoProviderError` for all standard `Error + Send + Sync + 'static` types.
impl<T, E> IntoProviderError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C, S>(self, code: C, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
        C: AsErrorCode,
    {
        self.map_err(|e| ProviderError::new_with_source_and_context(code, message, e))
    }
}

// Implement `IntoProviderError` for options where `None` is converted into an error.
impl<T> IntoProviderError<T> for std::option::Option<T> {
    fn context<C, S>(self, c: C, m: S) -> Result<T, ProviderError>
    where
        S: Into<String>,
        C: AsErrorCode,
    {
        self.ok_or_else(|| ProviderError::new_with_context(c, m))
    }
}

#[cfg(test)]
mod test {
    use super::{ErrorCode, IntoProviderError, ProviderError};

    #[test]
    fn display_includes_context_and_source() {
        let parse: Result<i32, _> = "x".parse::<i32>();
        let e = parse.context(ErrorCode::InvalidArgument, "numCpus").unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidArgument);
        assert_eq!(
            e.to_string(),
            "The machine class is invalid, numCpus: invalid digit found in string"
        );
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn option_context() {
        let e = None::<()>
            .context(&ErrorCode::NotFound, "machine 'a' not found")
            .unwrap_err();
        assert!(e.is_not_found());
        assert!(e.inner().is_none());
        assert_eq!(e.context(), Some("machine 'a' not found"));
        let e = ProviderError::new_with_context(ErrorCode::Internal, "PowerOff failed");
        assert_eq!(e.to_string(), "The operation failed, PowerOff failed");
    }
}

//! Structured error handling for storage operations.

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors a storage backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Configuration or input is malformed or missing.
    Invalid,
    /// Credentials were rejected.
    Permission,
    /// The referenced blob does not exist.
    NotExist,
    /// The backend could not read its own metadata.
    Internal,
    /// Transport or remote service failure.
    Io,
    /// The backend does not support the requested capability.
    Unsupported,
}

impl ErrorKind {
    /// Check if this error kind is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

/// Structured error type carrying a kind and the operation that failed.
#[must_use]
#[derive(Debug, Error)]
#[error(
    "{}[{kind}]{}",
    .op.as_ref().map(|op| format!("{op}: ")).unwrap_or_default(),
    .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
)]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Operation tag, e.g. `openstack.Download`.
    pub op: Option<&'static str>,
    /// Primary error message.
    pub message: Option<String>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            op: None,
            message: None,
            source: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            op: None,
            message: None,
            source: Some(source.into()),
        }
    }

    /// Creates a new invalid configuration/input error.
    pub fn invalid() -> Self {
        Self::new(ErrorKind::Invalid)
    }

    /// Creates a new permission error.
    pub fn permission() -> Self {
        Self::new(ErrorKind::Permission)
    }

    /// Creates a new not-exist error.
    pub fn not_exist() -> Self {
        Self::new(ErrorKind::NotExist)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Creates a new I/O error.
    pub fn io() -> Self {
        Self::new(ErrorKind::Io)
    }

    /// Creates a new unsupported-capability error.
    pub fn unsupported() -> Self {
        Self::new(ErrorKind::Unsupported)
    }

    /// Tags this error with the operation that produced it.
    pub fn with_op(mut self, op: &'static str) -> Self {
        self.op = Some(op);
        self
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the referenced blob does not exist.
    ///
    /// Callers treat this as a normal, recoverable outcome.
    pub fn is_not_exist(&self) -> bool {
        self.kind == ErrorKind::NotExist
    }

    /// Check if this error is retryable based on its kind.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

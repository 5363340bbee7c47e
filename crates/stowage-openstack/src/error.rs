//! Internal error types for the Keystone and Swift clients.

use reqwest::{Method, StatusCode};
use stowage_core::ErrorKind;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error raised by the Keystone and Swift clients.
///
/// These are converted into [`stowage_core::Error`] at the storage boundary,
/// where the operation decides which kind a failure maps to.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Malformed URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// URL that cannot carry path segments.
    #[error("URL {0:?} cannot be used as a base")]
    NotABase(String),
    /// Unexpected response status.
    #[error("{method} {path} returned {status}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
    },
    /// The identity service rejected the credentials.
    #[error("identity service rejected the credentials ({0})")]
    Unauthorized(StatusCode),
    /// The identity service answered without a token.
    #[error("identity response carries no token")]
    MissingToken,
    /// The service catalog has no usable object-store endpoint.
    #[error("no public object-store endpoint in region {region:?}")]
    NoEndpoint { region: String },
    /// A continuation token that does not address the container.
    #[error("invalid continuation token: {0}")]
    InvalidToken(String),
}

impl Error {
    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::Unauthorized(status) => Some(*status),
            Self::Reqwest(err) => err.status(),
            _ => None,
        }
    }

    /// Whether the remote service reported the resource absent.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Kind a failure maps to while constructing the backend.
    ///
    /// Anything that goes wrong talking to the identity service is a
    /// permission failure; a bad endpoint or client setup is invalid
    /// configuration.
    pub(crate) fn connect_kind(&self) -> ErrorKind {
        match self {
            Self::HttpClient(_)
            | Self::Url(_)
            | Self::NotABase(_)
            | Self::NoEndpoint { .. }
            | Self::InvalidToken(_) => ErrorKind::Invalid,
            Self::Reqwest(_)
            | Self::Serde(_)
            | Self::Status { .. }
            | Self::Unauthorized(_)
            | Self::MissingToken => ErrorKind::Permission,
        }
    }

    /// Converts into a storage error of `kind` tagged with `op`.
    pub(crate) fn into_storage(self, op: &'static str, kind: ErrorKind) -> stowage_core::Error {
        stowage_core::Error::new(kind)
            .with_op(op)
            .with_message(self.to_string())
            .with_source(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = Error::Status {
            method: Method::GET,
            path: "/v1/AUTH_test/blocks/missing".to_string(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "GET /v1/AUTH_test/blocks/missing returned 404 Not Found"
        );

        assert!(!Error::MissingToken.is_not_found());
    }

    #[test]
    fn test_connect_kind() {
        assert_eq!(
            Error::Unauthorized(StatusCode::UNAUTHORIZED).connect_kind(),
            ErrorKind::Permission
        );
        assert_eq!(Error::MissingToken.connect_kind(), ErrorKind::Permission);
        assert_eq!(
            Error::NoEndpoint {
                region: "nowhere".to_string()
            }
            .connect_kind(),
            ErrorKind::Invalid
        );
    }

    #[test]
    fn test_into_storage() {
        let err = Error::InvalidToken("foreign container".to_string())
            .into_storage("openstack.List", ErrorKind::Invalid);

        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.op, Some("openstack.List"));
        assert!(err.source.is_some());
    }
}

//! Scoped Keystone token paired with its object-store endpoint.

use std::fmt;

use jiff::{SignedDuration, Timestamp};
use url::Url;

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_MARGIN: SignedDuration = SignedDuration::from_secs(30);

/// A scoped token and the object-store endpoint it was issued for.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    endpoint: Url,
    expires_at: Option<Timestamp>,
}

impl AuthToken {
    /// Creates a token for `endpoint`.
    pub fn new(value: impl Into<String>, endpoint: Url, expires_at: Option<Timestamp>) -> Self {
        Self {
            value: value.into(),
            endpoint,
            expires_at,
        }
    }

    /// The token sent as `X-Auth-Token`.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Object-store endpoint resolved from the service catalog.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// When the identity service said the token expires.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Whether the token is expired, or about to, at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at
            .and_then(|expires_at| expires_at.checked_sub(EXPIRY_MARGIN).ok())
            .is_some_and(|deadline| now >= deadline)
    }

    /// Whether the token is expired, or about to be.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"***")
            .field("endpoint", &self.endpoint.as_str())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("http://swift.example/v1/AUTH_demo").unwrap()
    }

    #[test]
    fn test_without_expiry_never_expires() {
        let token = AuthToken::new("abc", endpoint(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expiry_margin() {
        let expires_at: Timestamp = "2030-01-01T12:00:00Z".parse().unwrap();
        let token = AuthToken::new("abc", endpoint(), Some(expires_at));

        let early: Timestamp = "2030-01-01T11:00:00Z".parse().unwrap();
        let close: Timestamp = "2030-01-01T11:59:45Z".parse().unwrap();

        assert!(!token.is_expired_at(early));
        assert!(token.is_expired_at(close));
        assert!(token.is_expired_at(expires_at));
    }

    #[test]
    fn test_debug_masks_value() {
        let token = AuthToken::new("gAAAAAsecret", endpoint(), None);
        let debug = format!("{token:?}");

        assert!(!debug.contains("gAAAAAsecret"));
        assert!(debug.contains("AUTH_demo"));
    }
}

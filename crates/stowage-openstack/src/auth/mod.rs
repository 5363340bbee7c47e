//! Keystone authentication.
//!
//! Issues password-scoped tokens from the identity service (v2.0 or v3) and
//! resolves the public object-store endpoint for the configured region from
//! the service catalog.

mod credentials;
mod keystone;
mod token;

pub use credentials::Credentials;
pub(crate) use keystone::Keystone;
pub use keystone::IdentityVersion;
pub use token::AuthToken;

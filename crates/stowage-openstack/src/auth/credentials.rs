//! Keystone password credentials.

use std::fmt;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Keystone password credentials scoped to a tenant (project).
///
/// The password is masked in debug output and never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct Credentials {
    /// Tenant (project) name to scope the token to
    #[cfg_attr(
        feature = "config",
        arg(long = "os-tenant-name", env = "OS_TENANT_NAME")
    )]
    pub tenant_name: String,

    /// Keystone username
    #[cfg_attr(feature = "config", arg(long = "os-username", env = "OS_USERNAME"))]
    pub username: String,

    /// Keystone password
    #[cfg_attr(
        feature = "config",
        arg(long = "os-password", env = "OS_PASSWORD", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub password: String,
}

impl Credentials {
    /// Creates new credentials.
    pub fn new(
        tenant_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_name", &self.tenant_name)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging
pub const TRACING_TARGET_AUTH: &str = "stowage_openstack::auth";
pub const TRACING_TARGET_CLIENT: &str = "stowage_openstack::client";
pub const TRACING_TARGET_STORAGE: &str = "stowage_openstack::storage";

mod auth;
mod client;
mod config;
mod error;
mod listing;
mod storage;

#[cfg(test)]
mod testing;

use futures::future::BoxFuture;
use stowage_core::{StorageOpts, StorageRegistry, StorageService};

pub use crate::auth::{AuthToken, Credentials, IdentityVersion};
pub use crate::client::SwiftClient;
pub use crate::config::{
    AUTH_URL_KEY, CONTAINER_KEY, DEFAULT_DOMAIN_NAME, DOMAIN_NAME_KEY, HTTP_TIMEOUT_KEY,
    LIST_LIMIT_KEY, OpenStackConfig, PASSWORD_KEY, PUBLIC_READ_ACL, REGION_KEY, TENANT_NAME_KEY,
    USER_AGENT_KEY, USERNAME_KEY,
};
pub use crate::error::{Error, Result};
pub use crate::listing::ObjectEntry;
pub use crate::storage::OpenStackStorage;

/// Name under which the backend registers itself.
pub const STORAGE_NAME: &str = "OpenStack";

/// Registers the OpenStack backend under [`STORAGE_NAME`].
///
/// # Errors
///
/// Fails if a backend with the same name is already registered.
pub fn register(registry: &mut StorageRegistry) -> stowage_core::Result<()> {
    registry.register(STORAGE_NAME, dial)
}

fn dial(opts: StorageOpts) -> BoxFuture<'static, stowage_core::Result<StorageService>> {
    Box::pin(async move {
        let storage = OpenStackStorage::from_opts(opts).await?;
        Ok(storage.into_service())
    })
}

//! CLI configuration.
//!
//! ```text
//! Cli
//! ├── openstack: OpenStackConfig  # Region, container, Keystone credentials
//! └── command: Command            # The storage operation to run
//! ```
//!
//! Connection settings can be given as flags or through the usual
//! `OS_*` environment variables:
//!
//! ```bash
//! export OS_AUTH_URL=https://keystone.example:5000/v3 OS_REGION_NAME=RegionOne
//! export OS_TENANT_NAME=demo OS_USERNAME=alice OS_PASSWORD=...
//! stowage --os-container blocks put abc ./block.bin
//! ```

use std::process;

use clap::Parser;
use stowage_openstack::OpenStackConfig;

use crate::command::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "stowage")]
#[command(about = "Store, fetch and list blobs in OpenStack Object Storage")]
#[command(version)]
pub struct Cli {
    /// OpenStack connection and container settings.
    #[clap(flatten)]
    pub openstack: OpenStackConfig,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments so that its
    /// variables act as defaults for `env`-backed flags.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            region = %self.openstack.region,
            container = %self.openstack.container,
            auth_url = %self.openstack.auth_url,
            username = %self.openstack.credentials.username,
            tenant = %self.openstack.credentials.tenant_name,
            domain = %self.openstack.domain_name,
            list_limit = self.openstack.list_limit,
            http_timeout_secs = ?self.openstack.http_timeout,
            "OpenStack configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

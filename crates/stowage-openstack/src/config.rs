//! Backend configuration and its option-map keys.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use stowage_core::{Error, Result, StorageOpts};
use url::Url;

use crate::auth::Credentials;

/// Region of the object-store endpoint.
pub const REGION_KEY: &str = "openstackRegion";
/// Target container name.
pub const CONTAINER_KEY: &str = "openstackContainer";
/// Keystone endpoint URL.
pub const AUTH_URL_KEY: &str = "openstackAuthURL";
/// Tenant (project) name.
pub const TENANT_NAME_KEY: &str = "privateOpenstackTenantName";
/// Keystone username.
pub const USERNAME_KEY: &str = "privateOpenstackUsername";
/// Keystone password.
pub const PASSWORD_KEY: &str = "privateOpenstackPassword";
/// User and project domain for identity v3.
pub const DOMAIN_NAME_KEY: &str = "openstackDomainName";
/// Page size used by `List`.
pub const LIST_LIMIT_KEY: &str = "openstackListLimit";
/// Transport timeout in seconds.
pub const HTTP_TIMEOUT_KEY: &str = "httpTimeout";
/// User-Agent header override.
pub const USER_AGENT_KEY: &str = "userAgent";

/// Domain used when none is configured.
pub const DEFAULT_DOMAIN_NAME: &str = "Default";

/// Read ACL entry that makes a container world-readable.
pub const PUBLIC_READ_ACL: &str = ".r:*";

const OP_NEW: &str = "openstack.New";

/// Configuration of the OpenStack backend.
///
/// Built either from a [`StorageOpts`] map (see [`OpenStackConfig::from_opts`])
/// or, with the `config` feature, from command-line flags and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct OpenStackConfig {
    /// Region of the object-store endpoint
    #[cfg_attr(feature = "config", arg(long = "os-region", env = "OS_REGION_NAME"))]
    pub region: String,

    /// Container holding the blobs
    #[cfg_attr(
        feature = "config",
        arg(long = "os-container", env = "STOWAGE_CONTAINER")
    )]
    pub container: String,

    /// Keystone endpoint URL (a path ending in v2.0 selects identity v2.0)
    #[cfg_attr(feature = "config", arg(long = "os-auth-url", env = "OS_AUTH_URL"))]
    pub auth_url: String,

    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(flatten)]
    pub credentials: Credentials,

    /// User and project domain for identity v3
    #[cfg_attr(
        feature = "config",
        arg(
            long = "os-domain-name",
            env = "OS_USER_DOMAIN_NAME",
            default_value = DEFAULT_DOMAIN_NAME
        )
    )]
    #[serde(default = "default_domain_name")]
    pub domain_name: String,

    /// Listing page size (0 lets the server choose)
    #[cfg_attr(
        feature = "config",
        arg(long = "os-list-limit", env = "OS_LIST_LIMIT", default_value_t = 0)
    )]
    #[serde(default)]
    pub list_limit: usize,

    /// HTTP request timeout in seconds
    #[cfg_attr(feature = "config", arg(long = "http-timeout", env = "HTTP_TIMEOUT"))]
    #[serde(default)]
    pub http_timeout: Option<u64>,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Re-authenticate when the token expires or is rejected
    #[cfg_attr(feature = "config", arg(skip = true))]
    #[serde(default = "default_allow_reauth")]
    pub allow_reauth: bool,
}

fn default_domain_name() -> String {
    DEFAULT_DOMAIN_NAME.to_owned()
}

fn default_allow_reauth() -> bool {
    true
}

impl OpenStackConfig {
    /// Creates a configuration with default optional settings.
    pub fn new(
        region: impl Into<String>,
        container: impl Into<String>,
        auth_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            region: region.into(),
            container: container.into(),
            auth_url: auth_url.into(),
            credentials,
            domain_name: default_domain_name(),
            list_limit: 0,
            http_timeout: None,
            user_agent: None,
            allow_reauth: default_allow_reauth(),
        }
    }

    /// Reads the configuration from an option map.
    ///
    /// # Errors
    ///
    /// Returns an `Invalid` error if a required key is missing or an optional
    /// value cannot be parsed. No network call is made.
    pub fn from_opts(opts: &StorageOpts) -> Result<Self> {
        let credentials = Credentials::new(
            opts.require(OP_NEW, TENANT_NAME_KEY)?,
            opts.require(OP_NEW, USERNAME_KEY)?,
            opts.require(OP_NEW, PASSWORD_KEY)?,
        );

        let mut config = Self::new(
            opts.require(OP_NEW, REGION_KEY)?,
            opts.require(OP_NEW, CONTAINER_KEY)?,
            opts.require(OP_NEW, AUTH_URL_KEY)?,
            credentials,
        );

        if let Some(domain_name) = opts.get(DOMAIN_NAME_KEY) {
            config.domain_name = domain_name.to_owned();
        }
        if let Some(list_limit) = opts.parse(OP_NEW, LIST_LIMIT_KEY)? {
            config.list_limit = list_limit;
        }
        config.http_timeout = opts.parse(OP_NEW, HTTP_TIMEOUT_KEY)?;
        config.user_agent = opts.get(USER_AGENT_KEY).map(str::to_owned);

        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration back into an option map.
    pub fn to_opts(&self) -> StorageOpts {
        let mut opts = StorageOpts::new()
            .with(REGION_KEY, &self.region)
            .with(CONTAINER_KEY, &self.container)
            .with(AUTH_URL_KEY, &self.auth_url)
            .with(TENANT_NAME_KEY, &self.credentials.tenant_name)
            .with(USERNAME_KEY, &self.credentials.username)
            .with(PASSWORD_KEY, &self.credentials.password)
            .with(DOMAIN_NAME_KEY, &self.domain_name);

        if self.list_limit > 0 {
            opts.insert(LIST_LIMIT_KEY, self.list_limit.to_string());
        }
        if let Some(timeout) = self.http_timeout {
            opts.insert(HTTP_TIMEOUT_KEY, timeout.to_string());
        }
        if let Some(user_agent) = &self.user_agent {
            opts.insert(USER_AGENT_KEY, user_agent);
        }

        opts
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(Error::invalid()
                .with_op(OP_NEW)
                .with_message("region cannot be empty"));
        }

        if self.container.trim().is_empty() {
            return Err(Error::invalid()
                .with_op(OP_NEW)
                .with_message("container cannot be empty"));
        }

        self.parsed_auth_url()?;
        Ok(())
    }

    /// Parses the Keystone endpoint URL.
    pub fn parsed_auth_url(&self) -> Result<Url> {
        let url = Url::parse(&self.auth_url).map_err(|err| {
            Error::invalid()
                .with_op(OP_NEW)
                .with_message(format!("invalid auth URL {:?}", self.auth_url))
                .with_source(err)
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid()
                .with_op(OP_NEW)
                .with_message(format!("auth URL must be http or https, got {:?}", url.scheme())));
        }

        Ok(url)
    }

    /// Returns the transport timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.http_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    fn default_user_agent() -> String {
        format!("stowage/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Set the listing page size.
    #[must_use]
    pub fn with_list_limit(mut self, list_limit: usize) -> Self {
        self.list_limit = list_limit;
        self
    }

    /// Set the identity v3 domain.
    #[must_use]
    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = domain_name.into();
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = Some(timeout_secs);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Enable or disable re-authentication.
    #[must_use]
    pub fn with_allow_reauth(mut self, allow_reauth: bool) -> Self {
        self.allow_reauth = allow_reauth;
        self
    }
}

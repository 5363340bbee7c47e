//! Swift REST client with transparent re-authentication.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tokio::sync::RwLock;
use url::Url;

use crate::auth::{AuthToken, Credentials, IdentityVersion, Keystone};
use crate::config::OpenStackConfig;
use crate::error::{Error, Result};
use crate::listing::ObjectEntry;
use crate::TRACING_TARGET_CLIENT;

/// Header carrying the token on every Swift request.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Container metadata header holding the read ACL.
const CONTAINER_READ_HEADER: &str = "X-Container-Read";

/// Appends `segments` to the path of `base`, percent-encoding each one.
pub(crate) fn push_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::NotABase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Inner client that holds the HTTP client and the shared token.
struct SwiftClientInner {
    http: Client,
    keystone: Keystone,
    token: RwLock<AuthToken>,
    allow_reauth: bool,
}

/// Authenticated Swift client.
///
/// Cheap to clone; clones share the HTTP connection pool and the cached
/// token. When a request is answered with 401, or the cached token is past
/// its expiry, the client authenticates again once and replays the request.
#[derive(Clone)]
pub struct SwiftClient {
    inner: Arc<SwiftClientInner>,
}

impl std::fmt::Debug for SwiftClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiftClient")
            .field("identity", &self.inner.keystone.version())
            .field("allow_reauth", &self.inner.allow_reauth)
            .finish_non_exhaustive()
    }
}

impl SwiftClient {
    /// Authenticates against Keystone and returns a ready client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built, the auth URL is malformed,
    /// the credentials are rejected or the catalog has no public object-store
    /// endpoint for the configured region.
    pub async fn connect(config: &OpenStackConfig) -> Result<Self> {
        let auth_url = Url::parse(&config.auth_url)?;

        let mut builder = Client::builder().user_agent(config.effective_user_agent());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(Error::HttpClient)?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            region = %config.region,
            timeout_ms = config.timeout().map(|timeout| timeout.as_millis() as u64),
            "Creating Swift client"
        );

        Self::with_http(
            http,
            &auth_url,
            config.credentials.clone(),
            &config.domain_name,
            &config.region,
            config.allow_reauth,
        )
        .await
    }

    /// Authenticates using an existing HTTP client.
    pub async fn with_http(
        http: Client,
        auth_url: &Url,
        credentials: Credentials,
        domain_name: &str,
        region: &str,
        allow_reauth: bool,
    ) -> Result<Self> {
        let keystone = Keystone::new(http.clone(), auth_url, credentials, domain_name, region)?;
        let token = keystone.authenticate().await?;

        let inner = SwiftClientInner {
            http,
            keystone,
            token: RwLock::new(token),
            allow_reauth,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Identity API version in use.
    pub fn identity_version(&self) -> IdentityVersion {
        self.inner.keystone.version()
    }

    /// Object-store endpoint of the current token.
    pub async fn endpoint(&self) -> Url {
        self.inner.token.read().await.endpoint().clone()
    }

    /// URL of `container` under the current endpoint.
    pub async fn container_url(&self, container: &str) -> Result<Url> {
        push_segments(&self.endpoint().await, &[container])
    }

    /// Uploads `contents` as `object`, replacing any existing object.
    pub async fn put_object(&self, container: &str, object: &str, contents: Bytes) -> Result<()> {
        let response = self
            .send(|http, token| {
                let url = push_segments(token.endpoint(), &[container, object])?;
                Ok(http.put(url).body(contents.clone()))
            })
            .await?;

        expect_success(Method::PUT, response)?;
        Ok(())
    }

    /// Downloads the full contents of `object`.
    pub async fn get_object(&self, container: &str, object: &str) -> Result<Bytes> {
        let response = self
            .send(|http, token| {
                let url = push_segments(token.endpoint(), &[container, object])?;
                Ok(http.get(url))
            })
            .await?;

        let response = expect_success(Method::GET, response)?;
        Ok(response.bytes().await?)
    }

    /// Deletes `object`. Returns `false` if it did not exist.
    pub async fn delete_object(&self, container: &str, object: &str) -> Result<bool> {
        let response = self
            .send(|http, token| {
                let url = push_segments(token.endpoint(), &[container, object])?;
                Ok(http.delete(url))
            })
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        expect_success(Method::DELETE, response)?;
        Ok(true)
    }

    /// Reads the read ACL of `container`.
    pub async fn container_read_acl(&self, container: &str) -> Result<Vec<String>> {
        let response = self
            .send(|http, token| {
                let url = push_segments(token.endpoint(), &[container])?;
                Ok(http.head(url))
            })
            .await?;

        let response = expect_success(Method::HEAD, response)?;
        let acl = response
            .headers()
            .get(CONTAINER_READ_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(parse_acl)
            .unwrap_or_default();

        Ok(acl)
    }

    /// Fetches one listing page from `url`.
    ///
    /// A 204 response or an empty body is an empty page.
    pub async fn list_objects(&self, url: &Url) -> Result<Vec<ObjectEntry>> {
        let response = self.send(|http, _| Ok(http.get(url.clone()))).await?;
        let response = expect_success(Method::GET, response)?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Creates `container`, optionally setting its read ACL.
    pub async fn create_container(&self, container: &str, read_acl: Option<&str>) -> Result<()> {
        let response = self
            .send(|http, token| {
                let url = push_segments(token.endpoint(), &[container])?;
                let request = http.put(url);
                Ok(match read_acl {
                    Some(acl) => request.header(CONTAINER_READ_HEADER, acl),
                    None => request,
                })
            })
            .await?;

        expect_success(Method::PUT, response)?;
        Ok(())
    }

    /// Deletes `container`, which must be empty.
    pub async fn delete_container(&self, container: &str) -> Result<()> {
        let response = self
            .send(|http, token| {
                let url = push_segments(token.endpoint(), &[container])?;
                Ok(http.delete(url))
            })
            .await?;

        expect_success(Method::DELETE, response)?;
        Ok(())
    }

    /// Sends a request built by `build`, re-authenticating once if needed.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client, &AuthToken) -> Result<RequestBuilder>,
    {
        let token = self.token().await?;
        let response = self.dispatch(&build, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.inner.allow_reauth {
            return Ok(response);
        }

        tracing::warn!(
            target: TRACING_TARGET_CLIENT,
            path = response.url().path(),
            "Token rejected, re-authenticating"
        );

        let token = self.refresh(token.value()).await?;
        self.dispatch(&build, &token).await
    }

    async fn dispatch<F>(&self, build: &F, token: &AuthToken) -> Result<Response>
    where
        F: Fn(&Client, &AuthToken) -> Result<RequestBuilder>,
    {
        let request = build(&self.inner.http, token)?.header(AUTH_TOKEN_HEADER, token.value());
        let response = request.send().await?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            path = response.url().path(),
            status = response.status().as_u16(),
            "Swift request completed"
        );

        Ok(response)
    }

    /// Returns the cached token, refreshing it first if it has expired.
    async fn token(&self) -> Result<AuthToken> {
        let token = self.inner.token.read().await.clone();

        if self.inner.allow_reauth && token.is_expired() {
            tracing::debug!(
                target: TRACING_TARGET_CLIENT,
                expires_at = ?token.expires_at(),
                "Token expired, re-authenticating"
            );
            return self.refresh(token.value()).await;
        }

        Ok(token)
    }

    /// Replaces the cached token unless another caller already did.
    async fn refresh(&self, stale: &str) -> Result<AuthToken> {
        let mut token = self.inner.token.write().await;

        if token.value() == stale {
            *token = self.inner.keystone.authenticate().await?;
        }

        Ok(token.clone())
    }
}

fn expect_success(method: Method, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(Error::Status {
        method,
        path: response.url().path().to_owned(),
        status,
    })
}

fn parse_acl(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

//! Keystone password authentication and service catalog lookup.

use jiff::Timestamp;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AuthToken, Credentials};
use crate::TRACING_TARGET_AUTH;
use crate::client::push_segments;
use crate::error::{Error, Result};

/// Header carrying the issued token in identity v3 responses.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Catalog type of the object-store service.
const OBJECT_STORE_TYPE: &str = "object-store";

/// Endpoint interface used to reach the object store.
const PUBLIC_INTERFACE: &str = "public";

/// Identity API version spoken to Keystone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityVersion {
    /// Identity v2.0 (`POST /tokens`).
    V2,
    /// Identity v3 (`POST /auth/tokens`).
    V3,
}

impl IdentityVersion {
    /// Detects the identity version from the auth URL path.
    ///
    /// A path ending in `v2.0` selects v2.0 and one ending in `v3` selects v3.
    /// Any other URL is treated as the unversioned identity root, so v3 is
    /// used and `/v3` appended. Returns the version and the versioned URL.
    pub fn detect(auth_url: &Url) -> Result<(Self, Url)> {
        let last = auth_url
            .path_segments()
            .ok_or_else(|| Error::NotABase(auth_url.to_string()))?
            .filter(|segment| !segment.is_empty())
            .last();

        match last {
            Some("v2.0") => Ok((Self::V2, auth_url.clone())),
            Some("v3") => Ok((Self::V3, auth_url.clone())),
            _ => Ok((Self::V3, push_segments(auth_url, &["v3"])?)),
        }
    }

    /// Version label as it appears in auth URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2 => "v2.0",
            Self::V3 => "v3",
        }
    }
}

/// Keystone client issuing scoped tokens for one region.
#[derive(Debug, Clone)]
pub(crate) struct Keystone {
    http: Client,
    version: IdentityVersion,
    auth_url: Url,
    credentials: Credentials,
    domain_name: String,
    region: String,
}

impl Keystone {
    pub fn new(
        http: Client,
        auth_url: &Url,
        credentials: Credentials,
        domain_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let (version, auth_url) = IdentityVersion::detect(auth_url)?;

        Ok(Self {
            http,
            version,
            auth_url,
            credentials,
            domain_name: domain_name.into(),
            region: region.into(),
        })
    }

    pub fn version(&self) -> IdentityVersion {
        self.version
    }

    /// Authenticates and resolves the object-store endpoint.
    pub async fn authenticate(&self) -> Result<AuthToken> {
        tracing::debug!(
            target: TRACING_TARGET_AUTH,
            version = self.version.as_str(),
            auth_url = %self.auth_url,
            username = %self.credentials.username,
            tenant = %self.credentials.tenant_name,
            "Requesting token"
        );

        let token = match self.version {
            IdentityVersion::V2 => self.authenticate_v2().await?,
            IdentityVersion::V3 => self.authenticate_v3().await?,
        };

        tracing::info!(
            target: TRACING_TARGET_AUTH,
            version = self.version.as_str(),
            region = %self.region,
            endpoint = %token.endpoint(),
            expires_at = ?token.expires_at(),
            "Authenticated with identity service"
        );

        Ok(token)
    }

    async fn authenticate_v3(&self) -> Result<AuthToken> {
        let url = push_segments(&self.auth_url, &["auth", "tokens"])?;
        let domain = V3Name {
            name: &self.domain_name,
        };
        let body = V3AuthRequest {
            auth: V3Auth {
                identity: V3Identity {
                    methods: ["password"],
                    password: V3Password {
                        user: V3User {
                            name: &self.credentials.username,
                            domain: domain.clone(),
                            password: &self.credentials.password,
                        },
                    },
                },
                scope: V3Scope {
                    project: V3Project {
                        name: &self.credentials.tenant_name,
                        domain,
                    },
                },
            },
        };

        let response = self.http.post(url).json(&body).send().await?;
        let response = check_auth_response(response)?;

        let value = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .ok_or(Error::MissingToken)?;

        let bytes = response.bytes().await?;
        let parsed: V3TokenResponse = serde_json::from_slice(&bytes)?;

        let endpoint = parsed
            .token
            .catalog
            .iter()
            .filter(|entry| entry.kind == OBJECT_STORE_TYPE)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| {
                endpoint.interface == PUBLIC_INTERFACE
                    && (endpoint.region_id.as_deref() == Some(self.region.as_str())
                        || endpoint.region.as_deref() == Some(self.region.as_str()))
            })
            .map(|endpoint| endpoint.url.as_str());

        let endpoint = self.parse_endpoint(endpoint)?;
        let expires_at = parse_expiry(parsed.token.expires_at.as_deref());

        Ok(AuthToken::new(value, endpoint, expires_at))
    }

    async fn authenticate_v2(&self) -> Result<AuthToken> {
        let url = push_segments(&self.auth_url, &["tokens"])?;
        let body = V2AuthRequest {
            auth: V2Auth {
                tenant_name: &self.credentials.tenant_name,
                password_credentials: V2PasswordCredentials {
                    username: &self.credentials.username,
                    password: &self.credentials.password,
                },
            },
        };

        let response = self.http.post(url).json(&body).send().await?;
        let response = check_auth_response(response)?;

        let bytes = response.bytes().await?;
        let parsed: V2AccessResponse = serde_json::from_slice(&bytes)?;
        let access = parsed.access;

        if access.token.id.is_empty() {
            return Err(Error::MissingToken);
        }

        let endpoint = access
            .service_catalog
            .iter()
            .filter(|entry| entry.kind == OBJECT_STORE_TYPE)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| endpoint.region.as_deref() == Some(self.region.as_str()))
            .and_then(|endpoint| endpoint.public_url.as_deref());

        let endpoint = self.parse_endpoint(endpoint)?;
        let expires_at = parse_expiry(access.token.expires.as_deref());

        Ok(AuthToken::new(access.token.id, endpoint, expires_at))
    }

    fn parse_endpoint(&self, endpoint: Option<&str>) -> Result<Url> {
        let endpoint = endpoint.ok_or_else(|| Error::NoEndpoint {
            region: self.region.clone(),
        })?;

        Ok(Url::parse(endpoint)?)
    }
}

fn check_auth_response(response: Response) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Unauthorized(status));
    }

    if !status.is_success() {
        return Err(Error::Status {
            method: Method::POST,
            path: response.url().path().to_owned(),
            status,
        });
    }

    Ok(response)
}

fn parse_expiry(raw: Option<&str>) -> Option<Timestamp> {
    let raw = raw?;
    match raw.parse() {
        Ok(timestamp) => Some(timestamp),
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET_AUTH,
                expires = raw,
                error = %err,
                "Ignoring unparsable token expiry"
            );
            None
        }
    }
}

#[derive(Serialize)]
struct V3AuthRequest<'a> {
    auth: V3Auth<'a>,
}

#[derive(Serialize)]
struct V3Auth<'a> {
    identity: V3Identity<'a>,
    scope: V3Scope<'a>,
}

#[derive(Serialize)]
struct V3Identity<'a> {
    methods: [&'a str; 1],
    password: V3Password<'a>,
}

#[derive(Serialize)]
struct V3Password<'a> {
    user: V3User<'a>,
}

#[derive(Serialize)]
struct V3User<'a> {
    name: &'a str,
    domain: V3Name<'a>,
    password: &'a str,
}

#[derive(Clone, Serialize)]
struct V3Name<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct V3Scope<'a> {
    project: V3Project<'a>,
}

#[derive(Serialize)]
struct V3Project<'a> {
    name: &'a str,
    domain: V3Name<'a>,
}

#[derive(Deserialize)]
struct V3TokenResponse {
    token: V3Token,
}

#[derive(Deserialize)]
struct V3Token {
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    catalog: Vec<V3CatalogEntry>,
}

#[derive(Deserialize)]
struct V3CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    endpoints: Vec<V3Endpoint>,
}

#[derive(Deserialize)]
struct V3Endpoint {
    url: String,
    #[serde(default)]
    interface: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
}

#[derive(Serialize)]
struct V2AuthRequest<'a> {
    auth: V2Auth<'a>,
}

#[derive(Serialize)]
struct V2Auth<'a> {
    #[serde(rename = "tenantName")]
    tenant_name: &'a str,
    #[serde(rename = "passwordCredentials")]
    password_credentials: V2PasswordCredentials<'a>,
}

#[derive(Serialize)]
struct V2PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct V2AccessResponse {
    access: V2Access,
}

#[derive(Deserialize)]
struct V2Access {
    token: V2Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<V2CatalogEntry>,
}

#[derive(Deserialize)]
struct V2Token {
    id: String,
    #[serde(default)]
    expires: Option<String>,
}

#[derive(Deserialize)]
struct V2CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    endpoints: Vec<V2Endpoint>,
}

#[derive(Deserialize)]
struct V2Endpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL", default)]
    public_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;

    fn keystone(auth_url: &str, region: &str, password: &str) -> Keystone {
        Keystone::new(
            Client::new(),
            &Url::parse(auth_url).unwrap(),
            Credentials::new("demo", "alice", password),
            "Default",
            region,
        )
        .unwrap()
    }

    #[test]
    fn test_detect_version() {
        let cases = [
            ("http://keystone:5000/v2.0", IdentityVersion::V2, "/v2.0"),
            ("http://keystone:5000/v2.0/", IdentityVersion::V2, "/v2.0/"),
            ("http://keystone:5000/v3", IdentityVersion::V3, "/v3"),
            ("http://keystone:5000/", IdentityVersion::V3, "/v3"),
            ("http://keystone/identity", IdentityVersion::V3, "/identity/v3"),
        ];

        for (raw, version, path) in cases {
            let (detected, url) = IdentityVersion::detect(&Url::parse(raw).unwrap()).unwrap();
            assert_eq!(detected, version, "{raw}");
            assert_eq!(url.path(), path, "{raw}");
        }
    }

    #[test]
    fn test_detect_rejects_opaque_url() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(matches!(
            IdentityVersion::detect(&url),
            Err(Error::NotABase(_))
        ));
    }

    #[test]
    fn test_parse_expiry() {
        assert!(parse_expiry(Some("2030-01-01T00:00:00.000000Z")).is_some());
        assert!(parse_expiry(Some("2030-01-01T00:00:00Z")).is_some());
        assert!(parse_expiry(Some("soon")).is_none());
        assert!(parse_expiry(None).is_none());
    }

    #[tokio::test]
    async fn test_authenticate_v3() {
        let server = FakeServer::start().await;
        let keystone = keystone(&server.auth_url_v3(), FakeServer::REGION, FakeServer::PASSWORD);

        let token = keystone.authenticate().await.unwrap();
        assert!(!token.value().is_empty());
        assert_eq!(token.endpoint().as_str(), server.swift_endpoint());
        assert!(token.expires_at().is_some());
    }

    #[tokio::test]
    async fn test_authenticate_v2() {
        let server = FakeServer::start().await;
        let keystone = keystone(&server.auth_url_v2(), FakeServer::REGION, FakeServer::PASSWORD);
        assert_eq!(keystone.version(), IdentityVersion::V2);

        let token = keystone.authenticate().await.unwrap();
        assert_eq!(token.endpoint().as_str(), server.swift_endpoint());
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = FakeServer::start().await;
        let keystone = keystone(&server.auth_url_v3(), FakeServer::REGION, "wrong");

        let err = keystone.authenticate().await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(StatusCode::UNAUTHORIZED)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_region() {
        let server = FakeServer::start().await;
        let keystone = keystone(&server.auth_url_v3(), "nowhere", FakeServer::PASSWORD);

        let err = keystone.authenticate().await.unwrap_err();
        assert!(matches!(err, Error::NoEndpoint { .. }));
    }
}

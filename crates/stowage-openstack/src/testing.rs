//! In-process Keystone and Swift stand-in for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::Router;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::auth::Credentials;
use crate::config::{OpenStackConfig, PUBLIC_READ_ACL};

const ACCOUNT: &str = "AUTH_test";
const DEFAULT_EXPIRY: &str = "2099-01-01T00:00:00.000000Z";
const INTERNAL_ENDPOINT: &str = "http://internal.invalid/swift/v1/AUTH_test";

type Shared = Arc<Mutex<FakeState>>;

#[derive(Default)]
struct FakeContainer {
    read_acl: Option<String>,
    objects: BTreeMap<String, Bytes>,
}

impl FakeContainer {
    fn is_public(&self) -> bool {
        self.read_acl
            .as_deref()
            .is_some_and(|acl| acl.split(',').any(|entry| entry.trim() == PUBLIC_READ_ACL))
    }
}

struct FakeState {
    endpoint: String,
    expiry: String,
    tokens: HashSet<String>,
    issued: usize,
    auth_requests: usize,
    list_requests: usize,
    containers: BTreeMap<String, FakeContainer>,
}

impl FakeState {
    fn issue_token(&mut self) -> String {
        self.issued += 1;
        let token = format!("tok-{}", self.issued);
        self.tokens.insert(token.clone());
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("x-auth-token")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|token| self.tokens.contains(token))
    }
}

/// Fake identity and object-store service bound to a local port.
pub(crate) struct FakeServer {
    base: String,
    state: Shared,
}

impl FakeServer {
    pub const REGION: &'static str = "RegionOne";
    pub const TENANT: &'static str = "demo";
    pub const USERNAME: &'static str = "alice";
    pub const PASSWORD: &'static str = "hunter2";

    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(Mutex::new(FakeState {
            endpoint: format!("{base}/swift/v1/{ACCOUNT}"),
            expiry: DEFAULT_EXPIRY.to_owned(),
            tokens: HashSet::new(),
            issued: 0,
            auth_requests: 0,
            list_requests: 0,
            containers: BTreeMap::new(),
        }));

        let app = Router::new()
            .route("/identity/v3/auth/tokens", post(issue_v3))
            .route("/identity/v2.0/tokens", post(issue_v2))
            .route("/swift/v1/{account}/{container}", any(container))
            .route("/swift/v1/{account}/{container}/{*object}", any(object))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, state }
    }

    pub fn auth_url_v3(&self) -> String {
        format!("{}/identity/v3", self.base)
    }

    pub fn auth_url_v2(&self) -> String {
        format!("{}/identity/v2.0", self.base)
    }

    pub fn swift_endpoint(&self) -> String {
        self.state.lock().unwrap().endpoint.clone()
    }

    pub fn config(&self, container: &str) -> OpenStackConfig {
        OpenStackConfig::new(
            Self::REGION,
            container,
            self.auth_url_v3(),
            Credentials::new(Self::TENANT, Self::USERNAME, Self::PASSWORD),
        )
        .with_timeout(10)
    }

    pub fn create_container(&self, name: &str, public: bool) {
        let container = FakeContainer {
            read_acl: public.then(|| PUBLIC_READ_ACL.to_owned()),
            objects: BTreeMap::new(),
        };
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(name.to_owned(), container);
    }

    /// Invalidates every issued token, as an expiry on the server would.
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    /// Sets the expiry reported for tokens issued from now on.
    pub fn set_token_expiry(&self, expiry: &str) {
        self.state.lock().unwrap().expiry = expiry.to_owned();
    }

    pub fn auth_requests(&self) -> usize {
        self.state.lock().unwrap().auth_requests
    }

    pub fn list_requests(&self) -> usize {
        self.state.lock().unwrap().list_requests
    }
}

async fn issue_v3(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.auth_requests += 1;

    let user = &body["auth"]["identity"]["password"]["user"];
    let project = &body["auth"]["scope"]["project"];
    if user["name"].as_str() != Some(FakeServer::USERNAME)
        || user["password"].as_str() != Some(FakeServer::PASSWORD)
        || project["name"].as_str() != Some(FakeServer::TENANT)
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let token = state.issue_token();
    let body = json!({
        "token": {
            "expires_at": state.expiry,
            "catalog": [
                {
                    "type": "identity",
                    "endpoints": [],
                },
                {
                    "type": "object-store",
                    "endpoints": [
                        {
                            "interface": "internal",
                            "region": FakeServer::REGION,
                            "region_id": FakeServer::REGION,
                            "url": INTERNAL_ENDPOINT,
                        },
                        {
                            "interface": "public",
                            "region": FakeServer::REGION,
                            "region_id": FakeServer::REGION,
                            "url": state.endpoint,
                        },
                    ],
                },
            ],
        },
    });

    (StatusCode::CREATED, [("x-subject-token", token)], Json(body)).into_response()
}

async fn issue_v2(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.auth_requests += 1;

    let auth = &body["auth"];
    if auth["tenantName"].as_str() != Some(FakeServer::TENANT)
        || auth["passwordCredentials"]["username"].as_str() != Some(FakeServer::USERNAME)
        || auth["passwordCredentials"]["password"].as_str() != Some(FakeServer::PASSWORD)
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let token = state.issue_token();
    let body = json!({
        "access": {
            "token": {
                "id": token,
                "expires": state.expiry,
            },
            "serviceCatalog": [
                {
                    "type": "object-store",
                    "endpoints": [
                        {
                            "region": FakeServer::REGION,
                            "publicURL": state.endpoint,
                            "internalURL": INTERNAL_ENDPOINT,
                        },
                    ],
                },
            ],
        },
    });

    Json(body).into_response()
}

async fn container(
    State(shared): State<Shared>,
    method: Method,
    Path((account, name)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut guard = shared.lock().unwrap();
    let state = &mut *guard;

    if account != ACCOUNT {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match method {
        Method::HEAD => {
            let Some(container) = state.containers.get(&name) else {
                return StatusCode::NOT_FOUND.into_response();
            };

            let mut response = StatusCode::NO_CONTENT.into_response();
            if let Some(acl) = &container.read_acl {
                response
                    .headers_mut()
                    .insert("x-container-read", HeaderValue::from_str(acl).unwrap());
            }
            response
        }
        Method::GET => {
            state.list_requests += 1;
            let Some(container) = state.containers.get(&name) else {
                return StatusCode::NOT_FOUND.into_response();
            };

            let limit = params
                .get("limit")
                .and_then(|limit| limit.parse().ok())
                .unwrap_or(10_000);
            let marker = params.get("marker");

            let entries: Vec<Value> = container
                .objects
                .iter()
                .filter(|(object, _)| marker.is_none_or(|marker| *object > marker))
                .take(limit)
                .map(|(object, contents)| {
                    json!({
                        "name": object,
                        "bytes": contents.len(),
                        "hash": "d41d8cd98f00b204e9800998ecf8427e",
                        "content_type": "application/octet-stream",
                        "last_modified": "2026-10-18T09:00:00.000000",
                    })
                })
                .collect();

            if entries.is_empty() {
                StatusCode::NO_CONTENT.into_response()
            } else {
                Json(entries).into_response()
            }
        }
        Method::PUT => {
            let read_acl = headers
                .get("x-container-read")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            match state.containers.get_mut(&name) {
                Some(container) => {
                    container.read_acl = read_acl;
                    StatusCode::ACCEPTED.into_response()
                }
                None => {
                    let container = FakeContainer {
                        read_acl,
                        objects: BTreeMap::new(),
                    };
                    state.containers.insert(name, container);
                    StatusCode::CREATED.into_response()
                }
            }
        }
        Method::DELETE => match state.containers.get(&name) {
            None => StatusCode::NOT_FOUND.into_response(),
            Some(container) if !container.objects.is_empty() => {
                StatusCode::CONFLICT.into_response()
            }
            Some(_) => {
                state.containers.remove(&name);
                StatusCode::NO_CONTENT.into_response()
            }
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn object(
    State(shared): State<Shared>,
    method: Method,
    Path((account, name, object)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut guard = shared.lock().unwrap();
    let state = &mut *guard;

    if account != ACCOUNT {
        return StatusCode::NOT_FOUND.into_response();
    }

    let public = state
        .containers
        .get(&name)
        .is_some_and(FakeContainer::is_public);
    let anonymous_read = method == Method::GET && public;
    if !anonymous_read && !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let Some(container) = state.containers.get_mut(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match method {
        Method::PUT => {
            container.objects.insert(object, body);
            StatusCode::CREATED.into_response()
        }
        Method::GET => match container.objects.get(&object) {
            Some(contents) => (StatusCode::OK, contents.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Method::DELETE => match container.objects.remove(&object) {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

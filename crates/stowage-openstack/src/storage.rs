//! OpenStack implementation of the storage interface.

use bytes::Bytes;
use stowage_core::{ErrorKind, ListPage, Result, Storage, StorageOpts, StorageService};

use crate::client::SwiftClient;
use crate::config::{OpenStackConfig, PUBLIC_READ_ACL};
use crate::listing::PageQuery;
use crate::{STORAGE_NAME, TRACING_TARGET_STORAGE};

const OP_NEW: &str = "openstack.New";
const OP_PUT: &str = "openstack.Put";
const OP_DOWNLOAD: &str = "openstack.Download";
const OP_DELETE: &str = "openstack.Delete";
const OP_LINK_BASE: &str = "openstack.LinkBase";
const OP_LIST: &str = "openstack.List";
const OP_CREATE_CONTAINER: &str = "openstack.CreateContainer";
const OP_DELETE_CONTAINER: &str = "openstack.DeleteContainer";

/// Storage backend keeping blobs as objects of one Swift container.
///
/// Holds an authenticated [`SwiftClient`] and the container name; every
/// operation is an independent request against that client.
#[derive(Debug, Clone)]
pub struct OpenStackStorage {
    client: SwiftClient,
    container: String,
    list_limit: usize,
}

impl OpenStackStorage {
    /// Authenticates and returns a backend for the configured container.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a malformed configuration, an unknown region or
    /// a client that cannot be built, and `Permission` when authentication
    /// fails.
    pub async fn connect(config: OpenStackConfig) -> Result<Self> {
        config.validate()?;

        let client = SwiftClient::connect(&config).await.map_err(|err| {
            let kind = err.connect_kind();
            err.into_storage(OP_NEW, kind)
        })?;

        tracing::info!(
            target: TRACING_TARGET_STORAGE,
            container = %config.container,
            region = %config.region,
            identity = client.identity_version().as_str(),
            "OpenStack storage ready"
        );

        Ok(Self {
            client,
            container: config.container,
            list_limit: config.list_limit,
        })
    }

    /// Reads an option map and connects.
    ///
    /// Missing or malformed options fail with `Invalid` before any network
    /// call is made.
    pub async fn from_opts(opts: StorageOpts) -> Result<Self> {
        let config = OpenStackConfig::from_opts(&opts)?;
        Self::connect(config).await
    }

    /// Wraps the backend into a [`StorageService`].
    pub fn into_service(self) -> StorageService {
        StorageService::new(STORAGE_NAME, self)
    }

    /// Name of the target container.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The underlying Swift client.
    pub fn client(&self) -> &SwiftClient {
        &self.client
    }

    /// Returns the page following `token` with a page-size hint.
    ///
    /// A hint of 0 lets the server choose. Continuation tokens carry their
    /// own page size, so the hint only applies to the first page.
    pub async fn list_with_limit(&self, token: &str, per_page: usize) -> Result<ListPage> {
        let container_url = self
            .client
            .container_url(&self.container)
            .await
            .map_err(|err| err.into_storage(OP_LIST, ErrorKind::Io))?;

        let query = if token.is_empty() {
            PageQuery::first(per_page)
        } else {
            PageQuery::from_token(&container_url, token)
                .map_err(|err| err.into_storage(OP_LIST, ErrorKind::Invalid))?
        };

        let url = query.to_url(&container_url);
        let entries = self
            .client
            .list_objects(&url)
            .await
            .map_err(|err| err.into_storage(OP_LIST, ErrorKind::Io))?;

        let Some(last) = entries.last() else {
            return Ok(ListPage::empty());
        };

        let next_token = query.after(&last.name).to_url(&container_url).to_string();
        let refs = entries.into_iter().map(Into::into).collect();

        Ok(ListPage::new(refs, next_token))
    }

    /// Creates the container, world-readable when `public` is set.
    pub async fn create_container(&self, public: bool) -> Result<()> {
        let read_acl = public.then_some(PUBLIC_READ_ACL);
        self.client
            .create_container(&self.container, read_acl)
            .await
            .map_err(|err| err.into_storage(OP_CREATE_CONTAINER, ErrorKind::Io))?;

        tracing::info!(
            target: TRACING_TARGET_STORAGE,
            container = %self.container,
            public,
            "Container created"
        );

        Ok(())
    }

    /// Deletes the container, which must be empty.
    pub async fn delete_container(&self) -> Result<()> {
        self.client
            .delete_container(&self.container)
            .await
            .map_err(|err| err.into_storage(OP_DELETE_CONTAINER, ErrorKind::Io))?;

        tracing::info!(
            target: TRACING_TARGET_STORAGE,
            container = %self.container,
            "Container deleted"
        );

        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for OpenStackStorage {
    async fn link_base(&self) -> Result<String> {
        let acl = self
            .client
            .container_read_acl(&self.container)
            .await
            .map_err(|err| err.into_storage(OP_LINK_BASE, ErrorKind::Internal))?;

        if !acl.iter().any(|entry| entry == PUBLIC_READ_ACL) {
            return Err(stowage_core::Error::unsupported()
                .with_op(OP_LINK_BASE)
                .with_message(format!("container {:?} is not public", self.container)));
        }

        let container_url = self
            .client
            .container_url(&self.container)
            .await
            .map_err(|err| err.into_storage(OP_LINK_BASE, ErrorKind::Internal))?;

        Ok(format!("{container_url}/"))
    }

    async fn download(&self, reference: &str) -> Result<Bytes> {
        self.client
            .get_object(&self.container, reference)
            .await
            .map_err(|err| {
                let kind = if err.is_not_found() {
                    ErrorKind::NotExist
                } else {
                    ErrorKind::Io
                };
                err.into_storage(OP_DOWNLOAD, kind)
            })
    }

    async fn put(&self, reference: &str, contents: Bytes) -> Result<()> {
        self.client
            .put_object(&self.container, reference, contents)
            .await
            .map_err(|err| err.into_storage(OP_PUT, ErrorKind::Io))
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let existed = self
            .client
            .delete_object(&self.container, reference)
            .await
            .map_err(|err| err.into_storage(OP_DELETE, ErrorKind::Io))?;

        if !existed {
            tracing::debug!(
                target: TRACING_TARGET_STORAGE,
                container = %self.container,
                reference,
                "Deleted reference did not exist"
            );
        }

        Ok(())
    }

    async fn list(&self, token: &str) -> Result<ListPage> {
        self.list_with_limit(token, self.list_limit).await
    }
}

//! The storage backend interface and listing types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListRefsItem {
    /// Reference of the blob within the backend.
    pub reference: String,
    /// Blob size in bytes.
    pub size: u64,
}

impl ListRefsItem {
    /// Creates a new listing entry.
    pub fn new(reference: impl Into<String>, size: u64) -> Self {
        Self {
            reference: reference.into(),
            size,
        }
    }
}

/// One page of a listing plus the token for the next page.
///
/// The token is opaque: callers pass it back verbatim to fetch the next
/// page. An empty token means there are no more pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    /// Entries on this page, in backend order.
    pub refs: Vec<ListRefsItem>,
    /// Token for the next page, empty on the last page.
    pub next_token: String,
}

impl ListPage {
    /// Creates a page from its entries and continuation token.
    pub fn new(refs: Vec<ListRefsItem>, next_token: impl Into<String>) -> Self {
        Self {
            refs,
            next_token: next_token.into(),
        }
    }

    /// An empty final page.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this is the final page.
    pub fn is_last(&self) -> bool {
        self.next_token.is_empty()
    }
}

/// Core trait implemented by every storage backend.
///
/// Each operation is an independent request against the backend; a failure
/// of one call does not affect later calls on the same instance.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Returns a URL prefix under which any reference can be fetched
    /// directly by appending the reference.
    ///
    /// Backends that cannot serve public links fail with
    /// [`ErrorKind::Unsupported`](crate::ErrorKind::Unsupported).
    async fn link_base(&self) -> Result<String>;

    /// Fetches the full contents stored under `reference`.
    async fn download(&self, reference: &str) -> Result<Bytes>;

    /// Stores `contents` under `reference`, replacing any existing blob.
    async fn put(&self, reference: &str, contents: Bytes) -> Result<()>;

    /// Removes the blob stored under `reference`.
    async fn delete(&self, reference: &str) -> Result<()>;

    /// Returns the page of references following `token`.
    ///
    /// An empty `token` requests the first page. Exactly one page is
    /// fetched per call.
    async fn list(&self, token: &str) -> Result<ListPage> {
        let _ = token;
        Err(Error::unsupported()
            .with_op("storage.List")
            .with_message("backend does not support listing"))
    }
}

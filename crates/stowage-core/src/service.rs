//! Storage service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::{ListPage, Result, Storage, TRACING_TARGET};

/// Storage service wrapper with observability.
///
/// This wrapper adds structured logging to any [`Storage`] implementation
/// and is what callers hold after dialing a backend. The inner backend is
/// wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct StorageService {
    backend: &'static str,
    inner: Arc<dyn Storage>,
}

impl fmt::Debug for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageService")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service wrapper around a named backend.
    pub fn new<S>(backend: &'static str, storage: S) -> Self
    where
        S: Storage + 'static,
    {
        Self {
            backend,
            inner: Arc::new(storage),
        }
    }

    /// Name of the wrapped backend.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Returns the public URL prefix of the backend.
    pub async fn link_base(&self) -> Result<String> {
        let started_at = Instant::now();
        let result = self.inner.link_base().await;
        self.observe("link_base", None, started_at.elapsed(), &result);
        result
    }

    /// Fetches the contents stored under `reference`.
    pub async fn download(&self, reference: &str) -> Result<Bytes> {
        let started_at = Instant::now();
        let result = self.inner.download(reference).await;
        self.observe("download", Some(reference), started_at.elapsed(), &result);

        if let Ok(contents) = &result {
            tracing::trace!(
                target: TRACING_TARGET,
                backend = self.backend,
                reference,
                size = contents.len(),
                "Downloaded blob"
            );
        }

        result
    }

    /// Stores `contents` under `reference`.
    pub async fn put(&self, reference: &str, contents: Bytes) -> Result<()> {
        let started_at = Instant::now();
        let size = contents.len();
        let result = self.inner.put(reference, contents).await;
        self.observe("put", Some(reference), started_at.elapsed(), &result);

        if result.is_ok() {
            tracing::trace!(
                target: TRACING_TARGET,
                backend = self.backend,
                reference,
                size,
                "Stored blob"
            );
        }

        result
    }

    /// Removes the blob stored under `reference`.
    pub async fn delete(&self, reference: &str) -> Result<()> {
        let started_at = Instant::now();
        let result = self.inner.delete(reference).await;
        self.observe("delete", Some(reference), started_at.elapsed(), &result);
        result
    }

    /// Returns the page of references following `token`.
    pub async fn list(&self, token: &str) -> Result<ListPage> {
        let started_at = Instant::now();
        let result = self.inner.list(token).await;
        self.observe("list", None, started_at.elapsed(), &result);

        if let Ok(page) = &result {
            tracing::trace!(
                target: TRACING_TARGET,
                backend = self.backend,
                count = page.refs.len(),
                last_page = page.is_last(),
                "Listed page"
            );
        }

        result
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        reference: Option<&str>,
        elapsed: Duration,
        result: &Result<T>,
    ) {
        match result {
            Ok(_) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    backend = self.backend,
                    operation,
                    reference,
                    elapsed_ms = elapsed.as_millis(),
                    "Storage operation completed"
                );
            }
            Err(error) if error.is_not_exist() => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    backend = self.backend,
                    operation,
                    reference,
                    elapsed_ms = elapsed.as_millis(),
                    "Blob does not exist"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    backend = self.backend,
                    operation,
                    reference,
                    error = %error,
                    kind = %error.kind(),
                    elapsed_ms = elapsed.as_millis(),
                    "Storage operation failed"
                );
            }
        }
    }
}

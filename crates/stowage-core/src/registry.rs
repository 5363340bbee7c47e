//! Backend registry: maps backend names to constructors.

use std::collections::BTreeMap;
use std::fmt;

use futures::future::BoxFuture;

use crate::{Error, Result, StorageOpts, StorageService, TRACING_TARGET};

/// Constructor building a backend from its options.
pub type StorageConstructor = fn(StorageOpts) -> BoxFuture<'static, Result<StorageService>>;

/// Registry of storage backends selectable by name at runtime.
///
/// Backends register once at startup; registering the same name twice is
/// an error so that a misconfigured binary refuses to start.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    constructors: BTreeMap<&'static str, StorageConstructor>,
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl StorageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`.
    ///
    /// # Errors
    ///
    /// Returns an `Invalid` error if `name` is already registered.
    pub fn register(&mut self, name: &'static str, constructor: StorageConstructor) -> Result<()> {
        const OP: &str = "storage.Register";

        if self.constructors.contains_key(name) {
            return Err(Error::invalid()
                .with_op(OP)
                .with_message(format!("storage {name:?} already registered")));
        }

        self.constructors.insert(name, constructor);

        tracing::debug!(
            target: TRACING_TARGET,
            backend = name,
            "Storage backend registered"
        );

        Ok(())
    }

    /// Whether a backend named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Names of all registered backends, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    /// Constructs the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns an `Invalid` error for an unknown name, or whatever error the
    /// backend constructor reports.
    pub async fn dial(&self, name: &str, opts: StorageOpts) -> Result<StorageService> {
        const OP: &str = "storage.Dial";

        let constructor = self.constructors.get(name).ok_or_else(|| {
            Error::invalid()
                .with_op(OP)
                .with_message(format!("storage {name:?} not registered"))
        })?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = name,
            opts = ?opts,
            "Dialing storage backend"
        );

        constructor(opts).await
    }
}

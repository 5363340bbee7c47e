#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod opts;
mod registry;
mod service;
mod storage;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use opts::{PRIVATE_PREFIX, StorageOpts};
pub use registry::{StorageConstructor, StorageRegistry};
pub use service::StorageService;
pub use storage::{ListPage, ListRefsItem, Storage};

/// Tracing target for storage operations.
pub const TRACING_TARGET: &str = "stowage_core::storage";

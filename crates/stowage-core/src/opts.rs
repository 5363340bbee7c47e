//! String-keyed configuration handed to storage constructors.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix marking an option as secret. Values of such options are never
/// printed by `Debug`.
pub const PRIVATE_PREFIX: &str = "private";

/// Configuration map passed to a storage constructor.
///
/// Keys and values are plain strings; each backend documents the keys it
/// reads. Keys starting with [`PRIVATE_PREFIX`] hold secrets.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageOpts {
    opts: BTreeMap<String, String>,
}

impl StorageOpts {
    /// Creates an empty option map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, returning the updated map.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.opts.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.opts.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.opts.contains_key(key)
    }

    /// Returns the value stored under `key`, or an `Invalid` error tagged
    /// with `op` when the key is missing.
    pub fn require(&self, op: &'static str, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            Error::invalid()
                .with_op(op)
                .with_message(format!("{key:?} option is required"))
        })
    }

    /// Parses the value under `key`, if present.
    ///
    /// A present but unparsable value is an `Invalid` error.
    pub fn parse<T>(&self, op: &'static str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };

        raw.trim().parse().map(Some).map_err(|err| {
            Error::invalid()
                .with_op(op)
                .with_message(format!("{key:?} option has invalid value {raw:?}"))
                .with_source(err)
        })
    }

    /// Iterates over all options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.opts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of options set.
    pub fn len(&self) -> usize {
        self.opts.len()
    }

    /// Whether no options are set.
    pub fn is_empty(&self) -> bool {
        self.opts.is_empty()
    }
}

impl fmt::Debug for StorageOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.opts {
            if key.starts_with(PRIVATE_PREFIX) {
                map.entry(key, &"***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for StorageOpts
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            opts: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for StorageOpts {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_with_and_get() {
        let opts = StorageOpts::new()
            .with("openstackRegion", "WAW1")
            .with("openstackContainer", "blocks");

        assert_eq!(opts.get("openstackRegion"), Some("WAW1"));
        assert_eq!(opts.len(), 2);
        assert!(opts.get("missing").is_none());
    }

    #[test]
    fn test_require_missing() {
        let opts = StorageOpts::new();
        let err = opts.require("test.New", "openstackRegion").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.op, Some("test.New"));
        assert!(err.to_string().contains("openstackRegion"));
    }

    #[test]
    fn test_parse() {
        let opts = StorageOpts::new().with("limit", " 25 ").with("bad", "lots");

        assert_eq!(opts.parse::<usize>("test", "limit").unwrap(), Some(25));
        assert_eq!(opts.parse::<usize>("test", "absent").unwrap(), None);

        let err = opts.parse::<usize>("test", "bad").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(err.source.is_some());
    }

    #[test]
    fn test_debug_masks_private_options() {
        let opts = StorageOpts::new()
            .with("privateOpenstackPassword", "hunter2")
            .with("openstackRegion", "WAW1");

        let debug = format!("{opts:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("WAW1"));
        assert!(debug.contains("privateOpenstackPassword"));
    }

    #[test]
    fn test_serde_transparent() {
        let opts: StorageOpts = serde_json::from_str(r#"{"a":"1","b":"2"}"#).unwrap();
        assert_eq!(opts.get("b"), Some("2"));
    }
}

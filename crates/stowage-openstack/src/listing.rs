//! Container listing pages and their continuation tokens.
//!
//! A continuation token is the URL of the next page: the container URL with
//! `format=json`, the page size, and `marker` set to the last name of the
//! previous page. Tokens are validated against the container before use so a
//! token can never redirect a request elsewhere.

use serde::{Deserialize, Serialize};
use stowage_core::ListRefsItem;
use url::Url;

use crate::error::{Error, Result};

const FORMAT_PARAM: &str = "format";
const LIMIT_PARAM: &str = "limit";
const MARKER_PARAM: &str = "marker";

/// One object of a JSON container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object name.
    pub name: String,
    /// Object size in bytes.
    pub bytes: u64,
    /// MIME type reported by the server.
    #[serde(default)]
    pub content_type: Option<String>,
    /// MD5 of the contents.
    #[serde(default)]
    pub hash: Option<String>,
    /// Last modification time as reported by the server.
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl From<ObjectEntry> for ListRefsItem {
    fn from(entry: ObjectEntry) -> Self {
        ListRefsItem::new(entry.name, entry.bytes)
    }
}

/// Query of one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PageQuery {
    limit: usize,
    marker: Option<String>,
}

impl PageQuery {
    /// Query for the first page. A `limit` of 0 lets the server choose.
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            marker: None,
        }
    }

    /// Recovers the query encoded in a continuation token.
    pub fn from_token(container_url: &Url, token: &str) -> Result<Self> {
        let url = Url::parse(token)
            .map_err(|err| Error::InvalidToken(format!("{token:?} is not a URL: {err}")))?;

        if url.origin() != container_url.origin() || url.path() != container_url.path() {
            return Err(Error::InvalidToken(format!(
                "{token:?} does not address container {}",
                container_url.path()
            )));
        }

        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                LIMIT_PARAM => {
                    query.limit = value.parse().map_err(|_| {
                        Error::InvalidToken(format!("{token:?} has invalid limit {value:?}"))
                    })?;
                }
                MARKER_PARAM => query.marker = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(query)
    }

    /// Query for the page following `marker`, with the same page size.
    pub fn after(&self, marker: &str) -> Self {
        Self {
            limit: self.limit,
            marker: Some(marker.to_owned()),
        }
    }

    /// Page URL under `container_url`; also the continuation token.
    pub fn to_url(&self, container_url: &Url) -> Url {
        let mut url = container_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear().append_pair(FORMAT_PARAM, "json");
            if self.limit > 0 {
                pairs.append_pair(LIMIT_PARAM, &self.limit.to_string());
            }
            if let Some(marker) = &self.marker {
                pairs.append_pair(MARKER_PARAM, marker);
            }
        }
        url
    }
}

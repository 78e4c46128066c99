//! JSON manifest catalog.
//!
//! The release feed is a JSON array of descriptors:
//!
//! ```json
//! [
//!   {
//!     "version": "0.8.3619",
//!     "filename": "datomic-free-0.8.3619.tar.gz",
//!     "url": "https://downloads.example.com/datomic-free-0.8.3619.tar.gz",
//!     "published_at": "2013-01-18T17:04:00Z"
//!   }
//! ]
//! ```
//!
//! Feeds are typically published newest-first; nothing here depends on
//! that.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::catalog::error::CatalogResult;
use crate::catalog::release::{Release, Version};
use crate::catalog::ReleaseCatalog;

/// one manifest record, as serialized in the feed
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    version: String,
    filename: String,
    url: String,
    published_at: DateTime<Utc>,
}

/// catalog backed by a JSON manifest served over HTTP
pub struct ManifestCatalog {
    url: String,
    client: reqwest::blocking::Client,
}

impl ManifestCatalog {
    /// create a catalog reading the manifest at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl ReleaseCatalog for ManifestCatalog {
    fn list(&self) -> CatalogResult<Vec<Release>> {
        let body = self
            .client
            .get(&self.url)
            .send()?
            .error_for_status()?
            .bytes()?;
        parse_manifest(&body)
    }
}

/// decode a manifest document into validated release descriptors
fn parse_manifest(body: &[u8]) -> CatalogResult<Vec<Release>> {
    let entries: Vec<ManifestEntry> = serde_json::from_slice(body)?;
    entries
        .into_iter()
        .map(|entry| {
            let version = Version::new(entry.version)?;
            Ok(Release::new(
                version,
                entry.filename,
                entry.url,
                entry.published_at,
            ))
        })
        .collect()
}

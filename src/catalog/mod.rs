//! release discovery
//!
//! A catalog is whatever knows which releases exist: the production
//! implementation fetches a JSON manifest feed, and [`StaticCatalog`]
//! serves a fixed list for embedding and tests. Catalogs make no
//! ordering promise - the orchestrator sorts by publication date
//! itself.

mod error;
mod manifest;
mod release;

pub use error::{CatalogError, CatalogResult};
pub use manifest::ManifestCatalog;
pub use release::{InvalidVersionError, Release, Version};

/// source of release descriptors
pub trait ReleaseCatalog {
    /// List every known release, in no particular order.
    fn list(&self) -> CatalogResult<Vec<Release>>;
}

/// fixed in-memory catalog
///
/// Intended for tests and embedding: hand it the releases you already
/// know about and it serves them back.
pub struct StaticCatalog {
    releases: Vec<Release>,
}

impl StaticCatalog {
    /// create a catalog over a fixed release list
    pub fn new(releases: Vec<Release>) -> Self {
        Self { releases }
    }
}

impl ReleaseCatalog for StaticCatalog {
    fn list(&self) -> CatalogResult<Vec<Release>> {
        Ok(self.releases.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_static_catalog_serves_releases() {
        let release = Release::new(
            Version::new("1.0").unwrap(),
            "pkg-1.0.tar.gz",
            "https://example.com/pkg-1.0.tar.gz",
            DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
        );
        let catalog = StaticCatalog::new(vec![release]);

        let listed = catalog.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].version.as_str(), "1.0");
    }
}

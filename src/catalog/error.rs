//! Catalog error types

use thiserror::Error;

use crate::catalog::release::InvalidVersionError;

/// errors raised while listing releases
#[derive(Debug, Error)]
pub enum CatalogError {
    /// the manifest feed could not be fetched
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// the manifest was not valid JSON of the expected shape
    #[error("catalog decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// a manifest entry carried an unusable version string
    #[error("invalid version in catalog: {0}")]
    Version(#[from] InvalidVersionError),
}

/// result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

//! History engine error types
//!
//! Everything here aborts the run: the engine never retries or recovers
//! locally. Completed releases stay tagged in the store, so a rerun
//! skips them and resumes at the failure point.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::catalog::CatalogError;
use crate::store::StoreError;

/// the main error type for history synthesis
#[derive(Debug, Error)]
pub enum HistoryError {
    /// archive could not be fetched or decoded
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// object or ref write failed (propagated, never retried)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// release list could not be obtained
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// a release's tag exists but the release was not pre-resolved
    #[error("tag {0} already exists but release was not pre-resolved to it")]
    DuplicateTag(String),

    /// the catalog returned no releases at all
    #[error("catalog returned no releases")]
    EmptyCatalog,

    /// the run was cancelled between releases
    #[error("cancelled before building release {0}")]
    Cancelled(String),
}

/// result type alias for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

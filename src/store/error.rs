//! Store layer error types
//!
//! All errors that can occur while reading or writing the object store
//! are defined here. We use `thiserror` for ergonomic error definition.

use std::path::PathBuf;

use thiserror::Error;

/// the main error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// error from the underlying git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// a tag with this name already exists
    #[error("tag already exists: {0}")]
    TagExists(String),

    /// the requested ref was not found
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// the requested commit was not found
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// the requested path is not present in the tree
    #[error("no entry at path: {0}")]
    EntryNotFound(String),

    /// repository does not exist at the given path
    #[error("repository not initialized: {0}")]
    NotInitialized(PathBuf),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::RefNotFound(_)
                | StoreError::CommitNotFound(_)
                | StoreError::EntryNotFound(_)
                | StoreError::NotInitialized(_)
        )
    }
}

/// result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

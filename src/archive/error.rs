//! Archive error types

use std::path::PathBuf;

use thiserror::Error;

/// errors raised while fetching or reading release archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// network failure while downloading an archive
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// the archive stream was malformed or could not be drained
    #[error("malformed archive {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// an archive member kind this pipeline cannot represent
    #[error("unsupported entry kind {kind} at {path}")]
    UnsupportedEntry { path: String, kind: String },

    /// a filename that would escape the cache directory
    #[error("invalid archive filename: {0}")]
    InvalidFilename(String),

    /// I/O error (cache filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub(crate) fn read(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// result type alias for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

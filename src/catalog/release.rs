//! release descriptors and version strings.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::CommitId;

/// A validated release version string.
///
/// Versions name tags and commit messages, so they carry similar
/// restrictions to ref names.
///
/// Valid versions:
/// - 1-64 characters
/// - digits, letters, dots, underscores, hyphens only
/// - must start with a digit (e.g. "0.8.3611", "1.0.6165-rc1")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// create a new Version, validating the input
    pub fn new(version: impl Into<String>) -> Result<Self, InvalidVersionError> {
        let version = version.into();
        Self::validate(&version)?;
        Ok(Self(version))
    }

    fn validate(version: &str) -> Result<(), InvalidVersionError> {
        if version.is_empty() {
            return Err(InvalidVersionError::Empty);
        }

        if version.len() > 64 {
            return Err(InvalidVersionError::TooLong(version.len()));
        }

        let first = version.chars().next().unwrap_or_default();
        if !first.is_ascii_digit() {
            return Err(InvalidVersionError::InvalidStart(first));
        }

        for (i, c) in version.chars().enumerate() {
            if !c.is_ascii_alphanumeric() && c != '.' && c != '_' && c != '-' {
                return Err(InvalidVersionError::InvalidCharacter { char: c, position: i });
            }
        }

        Ok(())
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// the tag name for this version ("v" prefix)
    pub fn tag_name(&self) -> String {
        format!("v{}", self.0)
    }

    /// Exact tag-matching rule used for pre-resolution.
    ///
    /// A tag resolves this version only if its name is the version with
    /// the "v" prefix or the bare version - never a substring match, so
    /// "0.8.1" can not claim the "v0.8.10" tag.
    pub fn matches_tag(&self, tag_name: &str) -> bool {
        tag_name == self.0 || tag_name.strip_prefix('v') == Some(self.0.as_str())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// error type for invalid version strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidVersionError {
    #[error("version cannot be empty")]
    Empty,
    #[error("version too long: {0} characters")]
    TooLong(usize),
    #[error("version must start with a digit, got '{0}'")]
    InvalidStart(char),
    #[error("invalid character '{char}' at position {position}")]
    InvalidCharacter { char: char, position: usize },
}

/// One published release of the project.
///
/// Immutable once constructed, except for the resolved commit, which is
/// set exactly once - either during pre-resolution against existing
/// tags, or after this run builds the release's commit. Identity is the
/// version.
#[derive(Debug, Clone)]
pub struct Release {
    pub version: Version,
    pub filename: String,
    pub archive_url: String,
    pub published_at: DateTime<Utc>,
    resolved_commit: Option<CommitId>,
}

impl Release {
    /// create an unresolved release descriptor
    pub fn new(
        version: Version,
        filename: impl Into<String>,
        archive_url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version,
            filename: filename.into(),
            archive_url: archive_url.into(),
            published_at,
            resolved_commit: None,
        }
    }

    /// the commit this release maps to, if known yet
    pub fn resolved_commit(&self) -> Option<CommitId> {
        self.resolved_commit
    }

    /// Record the commit this release maps to.
    ///
    /// A release resolves exactly once per run.
    pub fn resolve(&mut self, commit: CommitId) {
        debug_assert!(
            self.resolved_commit.is_none(),
            "release {} resolved twice",
            self.version
        );
        self.resolved_commit = Some(commit);
    }
}

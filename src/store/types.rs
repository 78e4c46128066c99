//! core type-safe wrappers around git primitives for the store layer.

use std::fmt;

use chrono::{DateTime, Utc};
use git2::Oid;

/// Git commit identifier.
///
/// This makes sure we don't accidentally pass a blob id where a commit
/// id is expected. The inner Oid is only accessible within the store
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// parse a CommitId from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, git2::Error> {
        Oid::from_str(hex).map(CommitId)
    }

    /// short form of the commit id
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git blob identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(pub(crate) Oid);

impl BlobId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub(crate) Oid);

impl TreeId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// one entry of a tree object: a file blob with its mode, or a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeNode {
    /// regular file entry
    File { blob: BlobId, mode: u32 },
    /// nested directory entry
    Dir { tree: TreeId },
}

/// a tag name together with the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub target: CommitId,
}

/// author/committer identity for commit signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// create a new identity
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// convert to a git2::Signature stamped at an explicit time
    pub(crate) fn signature_at(
        &self,
        when: DateTime<Utc>,
    ) -> Result<git2::Signature<'static>, git2::Error> {
        let time = git2::Time::new(when.timestamp(), 0);
        git2::Signature::new(&self.name, &self.email, &time)
    }
}

/// mode bits for a directory entry inside a tree
pub(crate) const MODE_TREE: u32 = 0o040000;

/// Normalize a recorded file mode to one of git's two canonical
/// regular-file modes. Trees admit only 0o100644 and 0o100755 for
/// regular files; any executable bit selects the latter.
pub(crate) fn canonical_file_mode(mode: u32) -> u32 {
    if mode & 0o111 != 0 {
        0o100755
    } else {
        0o100644
    }
}

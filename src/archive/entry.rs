//! one file member of a release archive.

use chrono::{DateTime, Utc};

/// mode bit marking a regular file in a tree entry
pub const REGULAR_FILE_BIT: u32 = 0o100000;

/// One regular-file member pulled out of a release archive.
///
/// Entries are transient: produced and consumed one at a time while a
/// release's tree is built, never persisted. Only path, content,
/// permission bits and modification time survive from the archive;
/// owner and size metadata are deliberately not preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// archive-root-relative path, container directory already stripped
    pub path: String,
    /// raw file content
    pub content: Vec<u8>,
    /// unix permission bits as stored in the archive
    pub permissions: u32,
    /// member modification time
    pub modified_at: DateTime<Utc>,
}

impl ArchiveEntry {
    /// create a new entry
    pub fn new(
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        permissions: u32,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            permissions,
            modified_at,
        }
    }

    /// tree entry mode: the regular-file bit OR'd with the archive's
    /// permission bits
    pub fn tree_mode(&self) -> u32 {
        REGULAR_FILE_BIT | (self.permissions & 0o7777)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_permissions(permissions: u32) -> ArchiveEntry {
        ArchiveEntry::new(
            "bin/run.sh",
            b"#!/bin/sh\n".to_vec(),
            permissions,
            DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn test_tree_mode_composition() {
        assert_eq!(entry_with_permissions(0o644).tree_mode(), 0o100644);
        assert_eq!(entry_with_permissions(0o755).tree_mode(), 0o100755);
    }

    #[test]
    fn test_tree_mode_masks_non_permission_bits() {
        // archives occasionally carry type bits in the mode field
        assert_eq!(entry_with_permissions(0o100644).tree_mode(), 0o100644);
    }
}

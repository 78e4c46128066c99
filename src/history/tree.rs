//! Tree building: one release archive becomes one tree object.
//!
//! The entry stream is drained exactly once into a flat, sorted path
//! index (blob written per file as we go), then the hierarchy is
//! assembled bottom-up: entries grouped by leading path segment, one
//! tree object written per directory level, root included. Sorting the
//! index first is what makes the result independent of the order the
//! archive happened to list its members in.

use std::collections::BTreeMap;

use crate::archive::{ArchiveEntry, ArchiveResult};
use crate::history::error::HistoryResult;
use crate::store::{BlobId, GitStore, TreeId, TreeNode};

/// flat path -> (blob, mode) index for one archive
type PathIndex = BTreeMap<String, (BlobId, u32)>;

/// Build one tree object from a stream of archive entries.
///
/// Writes one blob per file and one tree per directory into `store`,
/// and returns the root tree id. Two streams carrying the same
/// (path, content, permissions) set produce the same id regardless of
/// iteration order. An empty stream produces the empty tree.
pub fn build_tree<I>(entries: I, store: &GitStore) -> HistoryResult<TreeId>
where
    I: IntoIterator<Item = ArchiveResult<ArchiveEntry>>,
{
    let mut index = PathIndex::new();
    for entry in entries {
        let entry = entry?;
        let mode = entry.tree_mode();
        let blob = store.write_blob(&entry.content)?;
        index.insert(entry.path, (blob, mode));
    }
    write_directory(&index, store)
}

/// recursively write one tree object per directory level
fn write_directory(index: &PathIndex, store: &GitStore) -> HistoryResult<TreeId> {
    let mut nodes: BTreeMap<String, TreeNode> = BTreeMap::new();
    let mut subdirs: BTreeMap<String, PathIndex> = BTreeMap::new();

    for (path, (blob, mode)) in index {
        match path.split_once('/') {
            None => {
                nodes.insert(
                    path.clone(),
                    TreeNode::File {
                        blob: *blob,
                        mode: *mode,
                    },
                );
            }
            Some((dir, rest)) => {
                subdirs
                    .entry(dir.to_string())
                    .or_default()
                    .insert(rest.to_string(), (*blob, *mode));
            }
        }
    }

    for (name, sub_index) in &subdirs {
        let tree = write_directory(sub_index, store)?;
        nodes.insert(name.clone(), TreeNode::Dir { tree });
    }

    Ok(store.write_tree(&nodes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveError;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, GitStore) {
        let dir = TempDir::new().unwrap();
        let store = GitStore::init(dir.path()).unwrap();
        (dir, store)
    }

    fn entry(path: &str, content: &[u8], permissions: u32) -> ArchiveEntry {
        ArchiveEntry::new(
            path,
            content.to_vec(),
            permissions,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    fn sample_entries() -> Vec<ArchiveEntry> {
        vec![
            entry("README", b"read me", 0o644),
            entry("bin/run.sh", b"#!/bin/sh\n", 0o755),
            entry("lib/core/a.clj", b"(ns a)", 0o644),
            entry("lib/core/b.clj", b"(ns b)", 0o644),
            entry("lib/z.txt", b"z", 0o644),
        ]
    }

    #[test]
    fn test_entry_order_does_not_change_tree_id() {
        let (_dir, store) = setup_store();

        let forward = sample_entries().into_iter().map(Ok);
        let tree_a = build_tree(forward, &store).unwrap();

        let reversed = sample_entries().into_iter().rev().map(Ok);
        let tree_b = build_tree(reversed, &store).unwrap();

        assert_eq!(tree_a, tree_b);
    }

    #[test]
    fn test_nested_directories_and_modes() {
        let (_dir, store) = setup_store();
        let tree = build_tree(sample_entries().into_iter().map(Ok), &store).unwrap();

        assert_eq!(store.tree_entry_mode(tree, "README").unwrap(), 0o100644);
        assert_eq!(store.tree_entry_mode(tree, "bin/run.sh").unwrap(), 0o100755);
        assert_eq!(
            store.tree_entry_mode(tree, "lib/core/a.clj").unwrap(),
            0o100644
        );
        assert_eq!(store.tree_entry_mode(tree, "lib/z.txt").unwrap(), 0o100644);
        assert!(store.tree_entry_mode(tree, "missing").is_err());
    }

    #[test]
    fn test_empty_stream_builds_empty_tree() {
        let (_dir, store) = setup_store();
        let tree = build_tree(std::iter::empty(), &store).unwrap();
        // the well-known empty tree
        assert_eq!(
            tree.to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn test_stream_error_aborts_build() {
        let (_dir, store) = setup_store();
        let entries = vec![
            Ok(entry("README", b"x", 0o644)),
            Err(ArchiveError::read(
                std::path::Path::new("pkg-1.0.tar.gz"),
                "truncated",
            )),
        ];

        let result = build_tree(entries, &store);
        assert!(matches!(
            result,
            Err(crate::history::HistoryError::Archive(_))
        ));
    }
}

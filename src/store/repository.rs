//! Core git repository wrapper.
//!
//! This is the central component of the store layer. It wraps
//! `git2::Repository` with thread-safe access and provides the handful
//! of high-level operations the history engine needs: object writes,
//! tag reads, and branch updates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use git2::Repository;
use parking_lot::RwLock;

use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{
    canonical_file_mode, BlobId, CommitId, Identity, TagRef, TreeId, TreeNode, MODE_TREE,
};

/// The main git store wrapper.
///
/// This provides thread-safe access to all git operations.
/// Clone this to share across threads - it uses Arc internally.
#[derive(Clone)]
pub struct GitStore {
    inner: Arc<GitStoreInner>,
}

struct GitStoreInner {
    repo: RwLock<Repository>,
    path: PathBuf,
}

impl GitStore {
    /// Open an existing repository.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo =
            Repository::open(path).map_err(|_| StoreError::NotInitialized(path.to_path_buf()))?;
        Ok(Self::wrap(repo, path))
    }

    /// Initialize a new bare repository.
    ///
    /// The store only ever holds objects and refs; nothing checks out a
    /// worktree, so a bare layout is all that is needed.
    pub fn init(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo = Repository::init_bare(path)?;
        Ok(Self::wrap(repo, path))
    }

    /// Open or initialize a repository.
    pub fn open_or_init(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        match Repository::open(path) {
            Ok(repo) => Ok(Self::wrap(repo, path)),
            Err(_) => Self::init(path),
        }
    }

    fn wrap(repo: Repository, path: &Path) -> Self {
        Self {
            inner: Arc::new(GitStoreInner {
                repo: RwLock::new(repo),
                path: path.to_path_buf(),
            }),
        }
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Execute a function with read access to the repository.
    fn with_repo<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Repository) -> StoreResult<T>,
    {
        let repo = self.inner.repo.read();
        f(&repo)
    }

    /// Execute a function with write access to the repository.
    fn with_repo_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Repository) -> StoreResult<T>,
    {
        let repo = self.inner.repo.write();
        f(&repo)
    }

    // ==================== Object Writes ====================

    /// Write raw bytes as a blob and return its id.
    ///
    /// Writing identical content twice yields the same id and is a
    /// no-op in the object database.
    pub fn write_blob(&self, content: &[u8]) -> StoreResult<BlobId> {
        self.with_repo_mut(|repo| Ok(BlobId::new(repo.blob(content)?)))
    }

    /// Write one tree object from a name -> node mapping.
    ///
    /// The mapping covers a single directory level; nested directories
    /// are passed as already-written subtrees. The `BTreeMap` keeps the
    /// entry order independent of how callers assembled it.
    pub fn write_tree(&self, entries: &BTreeMap<String, TreeNode>) -> StoreResult<TreeId> {
        self.with_repo_mut(|repo| {
            let mut builder = repo.treebuilder(None)?;
            for (name, node) in entries {
                match node {
                    TreeNode::File { blob, mode } => {
                        builder.insert(name, blob.raw(), canonical_file_mode(*mode) as i32)?;
                    }
                    TreeNode::Dir { tree } => {
                        builder.insert(name, tree.raw(), MODE_TREE as i32)?;
                    }
                }
            }
            Ok(TreeId::new(builder.write()?))
        })
    }

    /// Write a commit object.
    ///
    /// `identity` signs as both author and committer, stamped at `when`
    /// rather than the wall clock, so rebuilt history carries the
    /// original release dates.
    pub fn write_commit(
        &self,
        tree: TreeId,
        parents: &[CommitId],
        identity: &Identity,
        when: DateTime<Utc>,
        message: &str,
    ) -> StoreResult<CommitId> {
        self.with_repo_mut(|repo| {
            let tree = repo.find_tree(tree.raw())?;
            let sig = identity.signature_at(when)?;

            let parent_commits: Vec<git2::Commit<'_>> = parents
                .iter()
                .map(|id| repo.find_commit(id.raw()))
                .collect::<Result<_, _>>()?;
            let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

            let oid = repo.commit(None, &sig, &sig, message, &tree, &parent_refs)?;
            Ok(CommitId::new(oid))
        })
    }

    /// Create a lightweight tag pointing at a commit.
    ///
    /// Fails with [`StoreError::TagExists`] if the name is taken. Tag
    /// creation is deliberately not idempotent - a collision means two
    /// different runs disagree about a release, and that must surface.
    pub fn write_tag(&self, name: &str, target: CommitId) -> StoreResult<()> {
        self.with_repo_mut(|repo| {
            if repo.find_reference(&tag_ref_path(name)).is_ok() {
                return Err(StoreError::TagExists(name.to_string()));
            }
            let object = repo.find_object(target.raw(), None)?;
            repo.tag_lightweight(name, &object, false)?;
            Ok(())
        })
    }

    /// Create the branch or force-point it at `target`.
    pub fn force_update_branch(&self, name: &str, target: CommitId) -> StoreResult<()> {
        self.with_repo_mut(|repo| {
            let log_message = format!("repoint {} to {}", name, target.short());
            repo.reference(&branch_ref_path(name), target.raw(), true, &log_message)?;
            Ok(())
        })
    }

    // ==================== Reads ====================

    /// Check if a tag with this name exists.
    pub fn tag_exists(&self, name: &str) -> bool {
        let repo = self.inner.repo.read();
        let exists = repo.find_reference(&tag_ref_path(name)).is_ok();
        exists
    }

    /// List every tag with the commit it resolves to.
    ///
    /// Annotated and lightweight tags both peel to their target commit.
    pub fn list_tags(&self) -> StoreResult<Vec<TagRef>> {
        self.with_repo(|repo| {
            let names = repo.tag_names(None)?;
            let mut tags = Vec::with_capacity(names.len());
            for name in names.iter().flatten() {
                let reference = repo.find_reference(&tag_ref_path(name))?;
                let commit = reference.peel_to_commit()?;
                tags.push(TagRef {
                    name: name.to_string(),
                    target: CommitId::new(commit.id()),
                });
            }
            Ok(tags)
        })
    }

    /// Resolve a branch name to its current commit id.
    pub fn resolve_branch(&self, name: &str) -> StoreResult<CommitId> {
        self.with_repo(|repo| {
            let reference = repo
                .find_reference(&branch_ref_path(name))
                .map_err(|_| StoreError::RefNotFound(name.to_string()))?;
            let commit = reference
                .peel_to_commit()
                .map_err(|_| StoreError::RefNotFound(name.to_string()))?;
            Ok(CommitId::new(commit.id()))
        })
    }

    /// Get information about a commit.
    pub fn commit_info(&self, id: CommitId) -> StoreResult<CommitInfo> {
        self.with_repo(|repo| {
            let commit = repo
                .find_commit(id.raw())
                .map_err(|_| StoreError::CommitNotFound(id.to_string()))?;
            Ok(CommitInfo::from_git2(&commit))
        })
    }

    /// Read a blob's content back from the store.
    pub fn read_blob(&self, id: BlobId) -> StoreResult<Vec<u8>> {
        self.with_repo(|repo| {
            let blob = repo.find_blob(id.raw())?;
            Ok(blob.content().to_vec())
        })
    }

    /// Look up the mode of the entry at `path` within a tree.
    pub fn tree_entry_mode(&self, tree: TreeId, path: &str) -> StoreResult<u32> {
        self.with_repo(|repo| {
            let tree = repo.find_tree(tree.raw())?;
            let entry = tree
                .get_path(Path::new(path))
                .map_err(|_| StoreError::EntryNotFound(path.to_string()))?;
            Ok(entry.filemode() as u32)
        })
    }

    /// Count every object in the object database.
    ///
    /// Used to verify that reruns over an already-built history perform
    /// no additional writes.
    pub fn object_count(&self) -> StoreResult<usize> {
        self.with_repo(|repo| {
            let odb = repo.odb()?;
            let mut count = 0usize;
            odb.foreach(|_| {
                count += 1;
                true
            })?;
            Ok(count)
        })
    }
}

fn tag_ref_path(name: &str) -> String {
    format!("refs/tags/{}", name)
}

fn branch_ref_path(name: &str) -> String {
    format!("refs/heads/{}", name)
}

/// information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub tree_id: TreeId,
    pub parent_ids: Vec<CommitId>,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// create CommitInfo from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let author = commit.author();
        let time = commit.time();
        let timestamp = Utc
            .timestamp_opt(time.seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            id: CommitId::new(commit.id()),
            tree_id: TreeId::new(commit.tree_id()),
            parent_ids: commit.parent_ids().map(CommitId::new).collect(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("unknown@unknown").to_string(),
            timestamp,
        }
    }

    /// get the first (or only) parent
    pub fn first_parent(&self) -> Option<CommitId> {
        self.parent_ids.first().copied()
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, GitStore) {
        let dir = TempDir::new().unwrap();
        let store = GitStore::init(dir.path()).unwrap();
        (dir, store)
    }

    fn identity() -> Identity {
        Identity::new("Test", "test@test.com")
    }

    fn when() -> DateTime<Utc> {
        DateTime::from_timestamp(1_600_000_000, 0).unwrap()
    }

    fn write_single_file_tree(store: &GitStore, content: &[u8], mode: u32) -> TreeId {
        let blob = store.write_blob(content).unwrap();
        let mut entries = BTreeMap::new();
        entries.insert("file.txt".to_string(), TreeNode::File { blob, mode });
        store.write_tree(&entries).unwrap()
    }

    #[test]
    fn test_blob_roundtrip() {
        let (_dir, store) = setup_store();
        let id = store.write_blob(b"hello").unwrap();
        assert_eq!(store.read_blob(id).unwrap(), b"hello");

        // content addressing: same bytes, same id
        let again = store.write_blob(b"hello").unwrap();
        assert_eq!(id, again);
    }

    #[test]
    fn test_tree_modes_are_canonical() {
        let (_dir, store) = setup_store();
        let tree = write_single_file_tree(&store, b"a", 0o100644);
        assert_eq!(store.tree_entry_mode(tree, "file.txt").unwrap(), 0o100644);

        let tree = write_single_file_tree(&store, b"b", 0o100755);
        assert_eq!(store.tree_entry_mode(tree, "file.txt").unwrap(), 0o100755);
    }

    #[test]
    fn test_commit_carries_given_timestamp_and_parents() {
        let (_dir, store) = setup_store();
        let tree = write_single_file_tree(&store, b"a", 0o100644);

        let first = store
            .write_commit(tree, &[], &identity(), when(), "first")
            .unwrap();
        let second = store
            .write_commit(tree, &[first], &identity(), when(), "second")
            .unwrap();

        let info = store.commit_info(second).unwrap();
        assert_eq!(info.parent_ids, vec![first]);
        assert_eq!(info.summary(), "second");
        assert_eq!(info.timestamp.timestamp(), 1_600_000_000);
        assert_eq!(info.author_name, "Test");

        let root = store.commit_info(first).unwrap();
        assert!(root.parent_ids.is_empty());
        assert_eq!(root.first_parent(), None);
    }

    #[test]
    fn test_tag_create_and_collision() {
        let (_dir, store) = setup_store();
        let tree = write_single_file_tree(&store, b"a", 0o100644);
        let commit = store
            .write_commit(tree, &[], &identity(), when(), "c")
            .unwrap();

        assert!(!store.tag_exists("v1.0"));
        store.write_tag("v1.0", commit).unwrap();
        assert!(store.tag_exists("v1.0"));

        let result = store.write_tag("v1.0", commit);
        assert!(matches!(result, Err(StoreError::TagExists(_))));

        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "v1.0");
        assert_eq!(tags[0].target, commit);
    }

    #[test]
    fn test_force_update_branch_creates_and_repoints() {
        let (_dir, store) = setup_store();
        let tree = write_single_file_tree(&store, b"a", 0o100644);
        let c1 = store
            .write_commit(tree, &[], &identity(), when(), "c1")
            .unwrap();
        let c2 = store
            .write_commit(tree, &[c1], &identity(), when(), "c2")
            .unwrap();

        assert!(matches!(
            store.resolve_branch("latest"),
            Err(StoreError::RefNotFound(_))
        ));

        store.force_update_branch("latest", c1).unwrap();
        assert_eq!(store.resolve_branch("latest").unwrap(), c1);

        // unconditional repoint, no compare-and-swap
        store.force_update_branch("latest", c2).unwrap();
        assert_eq!(store.resolve_branch("latest").unwrap(), c2);
    }

    #[test]
    fn test_object_count_tracks_writes() {
        let (_dir, store) = setup_store();
        let before = store.object_count().unwrap();
        let _ = write_single_file_tree(&store, b"new content", 0o100644);
        let after = store.object_count().unwrap();
        assert_eq!(after, before + 2); // one blob, one tree

        // rewriting identical content adds nothing
        let _ = write_single_file_tree(&store, b"new content", 0o100644);
        assert_eq!(store.object_count().unwrap(), after);
    }

    #[test]
    fn test_open_or_init() {
        let dir = TempDir::new().unwrap();
        let store = GitStore::open_or_init(dir.path()).unwrap();
        let tree = write_single_file_tree(&store, b"a", 0o100644);
        let commit = store
            .write_commit(tree, &[], &identity(), when(), "c")
            .unwrap();
        store.write_tag("v1.0", commit).unwrap();
        drop(store);

        // reopening sees the same state
        let reopened = GitStore::open_or_init(dir.path()).unwrap();
        assert!(reopened.tag_exists("v1.0"));
    }
}

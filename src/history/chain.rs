//! Commit chain building: the ordered fold over releases.
//!
//! Releases arrive oldest-first and are processed strictly in order,
//! because each commit needs its predecessor's id as parent. A release
//! that already resolved to a tagged commit contributes nothing but its
//! id; an unresolved one gets a tree, a commit and a tag, in that
//! order, with the tag collision checked up front so a failed release
//! leaves no objects behind.

use tracing::{debug, info};

use crate::archive::{ArchiveFetcher, ArchiveReader};
use crate::catalog::Release;
use crate::history::error::{HistoryError, HistoryResult};
use crate::history::tree::build_tree;
use crate::history::updater::CancelFlag;
use crate::store::{CommitId, GitStore, Identity};

/// builds the linear commit chain for an ordered release list
pub struct CommitChainBuilder<'a> {
    store: &'a GitStore,
    fetcher: &'a dyn ArchiveFetcher,
    reader: &'a dyn ArchiveReader,
    identity: Identity,
    project: String,
    cancel: CancelFlag,
}

impl<'a> CommitChainBuilder<'a> {
    /// create a chain builder
    pub fn new(
        store: &'a GitStore,
        fetcher: &'a dyn ArchiveFetcher,
        reader: &'a dyn ArchiveReader,
        identity: Identity,
        project: impl Into<String>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            store,
            fetcher,
            reader,
            identity,
            project: project.into(),
            cancel,
        }
    }

    /// Fold the release list (oldest first) into a linear commit chain.
    ///
    /// Returns the newest release's commit id. Each release's commit -
    /// pre-resolved or freshly built - becomes the parent of the next.
    /// Cancellation is honored between releases: a release is either
    /// fully built (tree, commit, tag) or not started.
    pub fn build_chain(&self, releases: &mut [Release]) -> HistoryResult<CommitId> {
        let mut parent: Option<CommitId> = None;

        for release in releases.iter_mut() {
            let commit = match release.resolved_commit() {
                Some(existing) => {
                    debug!(
                        version = %release.version,
                        commit = %existing.short(),
                        "release already tagged, skipping"
                    );
                    existing
                }
                None => {
                    if self.cancel.is_cancelled() {
                        return Err(HistoryError::Cancelled(release.version.to_string()));
                    }
                    let built = self.build_release(release, parent)?;
                    release.resolve(built);
                    built
                }
            };
            parent = Some(commit);
        }

        parent.ok_or(HistoryError::EmptyCatalog)
    }

    /// build tree, commit and tag for one unresolved release
    fn build_release(
        &self,
        release: &Release,
        parent: Option<CommitId>,
    ) -> HistoryResult<CommitId> {
        let tag = release.version.tag_name();
        // check before writing anything: a collision must not leave
        // stray objects behind
        if self.store.tag_exists(&tag) {
            return Err(HistoryError::DuplicateTag(tag));
        }

        let archive = self
            .fetcher
            .fetch(&release.archive_url, &release.filename)?;
        info!(version = %release.version, archive = %archive.display(), "building release tree");

        let entries = self.reader.entries(&archive)?;
        let tree = build_tree(entries, self.store)?;

        let parents: Vec<CommitId> = parent.into_iter().collect();
        let message = format!("{} {}", self.project, release.version);
        let commit = self.store.write_commit(
            tree,
            &parents,
            &self.identity,
            release.published_at,
            &message,
        )?;
        self.store.write_tag(&tag, commit)?;
        info!(version = %release.version, %tag, commit = %commit.short(), "release committed and tagged");

        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::updater::tests::{release, FakeFetcher, FakeReader};
    use tempfile::TempDir;

    fn setup() -> (TempDir, GitStore) {
        let dir = TempDir::new().unwrap();
        let store = GitStore::init(dir.path()).unwrap();
        (dir, store)
    }

    fn chain_builder<'a>(
        store: &'a GitStore,
        fetcher: &'a FakeFetcher,
        reader: &'a FakeReader,
    ) -> CommitChainBuilder<'a> {
        CommitChainBuilder::new(
            store,
            fetcher,
            reader,
            Identity::new("Datomic", "info@datomic.com"),
            "Datomic",
            CancelFlag::new(),
        )
    }

    #[test]
    fn test_chain_is_linear_oldest_to_newest() {
        let (_dir, store) = setup();
        let fetcher = FakeFetcher::new();
        let reader = FakeReader::with_versions(&["1.0", "1.1", "1.2"]);
        let mut releases = vec![
            release("1.0", 1_000),
            release("1.1", 2_000),
            release("1.2", 3_000),
        ];

        let head = chain_builder(&store, &fetcher, &reader)
            .build_chain(&mut releases)
            .unwrap();

        let c2 = store.commit_info(head).unwrap();
        assert_eq!(c2.message, "Datomic 1.2");
        assert_eq!(c2.timestamp.timestamp(), 3_000);

        let c1 = store.commit_info(c2.first_parent().unwrap()).unwrap();
        assert_eq!(c1.message, "Datomic 1.1");
        let c0 = store.commit_info(c1.first_parent().unwrap()).unwrap();
        assert_eq!(c0.message, "Datomic 1.0");
        assert!(c0.parent_ids.is_empty());

        for version in ["1.0", "1.1", "1.2"] {
            assert!(store.tag_exists(&format!("v{version}")));
        }
        assert_eq!(releases[2].resolved_commit(), Some(head));
    }

    #[test]
    fn test_pre_resolved_release_contributes_parent_without_writes() {
        let (_dir, store) = setup();
        let fetcher = FakeFetcher::new();
        let reader = FakeReader::with_versions(&["1.0", "1.1"]);

        // build 1.0 for real, then rerun with 1.0 pre-resolved
        let mut first = vec![release("1.0", 1_000)];
        let c0 = chain_builder(&store, &fetcher, &reader)
            .build_chain(&mut first)
            .unwrap();

        let before = store.object_count().unwrap();
        let mut second = vec![release("1.0", 1_000), release("1.1", 2_000)];
        second[0].resolve(c0);
        let head = chain_builder(&store, &fetcher, &reader)
            .build_chain(&mut second)
            .unwrap();

        assert_eq!(store.commit_info(head).unwrap().first_parent(), Some(c0));
        // only 1.1's objects were added
        assert!(store.object_count().unwrap() > before);
        assert_eq!(fetcher.fetch_count(), 2); // 1.0 once, 1.1 once
    }

    #[test]
    fn test_duplicate_tag_fails_before_writing() {
        let (_dir, store) = setup();
        let fetcher = FakeFetcher::new();
        let reader = FakeReader::with_versions(&["1.0"]);

        let mut first = vec![release("1.0", 1_000)];
        chain_builder(&store, &fetcher, &reader)
            .build_chain(&mut first)
            .unwrap();

        // same version again, NOT pre-resolved
        let before = store.object_count().unwrap();
        let mut again = vec![release("1.0", 1_000)];
        let result = chain_builder(&store, &fetcher, &reader).build_chain(&mut again);

        assert!(matches!(result, Err(HistoryError::DuplicateTag(tag)) if tag == "v1.0"));
        // nothing leaked from the failed attempt
        assert_eq!(store.object_count().unwrap(), before);
    }

    #[test]
    fn test_empty_release_list_is_an_error() {
        let (_dir, store) = setup();
        let fetcher = FakeFetcher::new();
        let reader = FakeReader::with_versions(&[]);

        let result = chain_builder(&store, &fetcher, &reader).build_chain(&mut []);
        assert!(matches!(result, Err(HistoryError::EmptyCatalog)));
    }

    #[test]
    fn test_cancellation_stops_before_next_build() {
        let (_dir, store) = setup();
        let fetcher = FakeFetcher::new();
        let reader = FakeReader::with_versions(&["1.0", "1.1"]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let builder = CommitChainBuilder::new(
            &store,
            &fetcher,
            &reader,
            Identity::new("Datomic", "info@datomic.com"),
            "Datomic",
            cancel,
        );
        let mut releases = vec![release("1.0", 1_000), release("1.1", 2_000)];
        let result = builder.build_chain(&mut releases);

        assert!(matches!(result, Err(HistoryError::Cancelled(v)) if v == "1.0"));
        assert!(!store.tag_exists("v1.0"));
    }
}

//! Orchestration of a full history update run.
//!
//! One run: list the catalog, order it chronologically, pre-resolve
//! releases whose tags already exist in the store, fold the commit
//! chain over the rest, and force-point the `latest` branch at the
//! final commit. The build fold is strictly sequential; only archive
//! downloads may run ahead, through a bounded prefetch pool warming the
//! fetcher's cache.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::archive::{ArchiveFetcher, ArchiveReader};
use crate::catalog::ReleaseCatalog;
use crate::history::chain::CommitChainBuilder;
use crate::history::error::{HistoryError, HistoryResult};
use crate::store::{CommitId, GitStore, Identity};

/// Cooperative cancellation signal for a run.
///
/// Cancelling takes effect between releases: the release being built is
/// finished (or fails on its own), the next one is never started.
/// Everything already committed and tagged stays valid and will be
/// skipped by the next run.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// create a fresh, un-cancelled flag
    pub fn new() -> Self {
        Self::default()
    }

    /// request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// configuration for a history update run
#[derive(Clone, Debug)]
pub struct UpdaterConfig {
    /// branch that tracks the newest release
    pub latest_ref: String,
    /// project name used in commit messages
    pub project: String,
    /// author/committer identity for synthesized commits
    pub identity: Identity,
    /// prefetch worker threads (0 disables prefetching)
    pub prefetch_workers: usize,
    /// cooperative cancellation signal
    pub cancel: CancelFlag,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            latest_ref: "latest".to_string(),
            project: "Datomic".to_string(),
            identity: Identity::new("Datomic", "info@datomic.com"),
            prefetch_workers: 0,
            cancel: CancelFlag::new(),
        }
    }
}

impl UpdaterConfig {
    /// set the branch name that tracks the newest release
    pub fn latest_ref(mut self, name: impl Into<String>) -> Self {
        self.latest_ref = name.into();
        self
    }

    /// set the project name used in commit messages
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// set the commit identity
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// set the number of prefetch workers
    pub fn prefetch_workers(mut self, workers: usize) -> Self {
        self.prefetch_workers = workers;
        self
    }

    /// install a cancellation flag shared with the caller
    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// top-level orchestrator for history synthesis
pub struct HistoryUpdater {
    store: GitStore,
    config: UpdaterConfig,
}

impl HistoryUpdater {
    /// create an updater with default configuration
    pub fn new(store: GitStore) -> Self {
        Self::with_config(store, UpdaterConfig::default())
    }

    /// create an updater with explicit configuration
    pub fn with_config(store: GitStore, config: UpdaterConfig) -> Self {
        Self { store, config }
    }

    /// Run one full update and return the final commit id.
    ///
    /// Rerunning against an unchanged catalog is a no-op apart from the
    /// (idempotent) branch repoint: every release pre-resolves through
    /// its tag and nothing new is written.
    pub fn run(
        &self,
        catalog: &dyn ReleaseCatalog,
        fetcher: Arc<dyn ArchiveFetcher>,
        reader: &dyn ArchiveReader,
    ) -> HistoryResult<CommitId> {
        let mut releases = catalog.list()?;
        if releases.is_empty() {
            return Err(HistoryError::EmptyCatalog);
        }

        // catalogs promise nothing about order; the chain is
        // chronological oldest-first. The sort is stable, so releases
        // sharing a timestamp keep their feed order.
        releases.sort_by_key(|release| release.published_at);

        let tags = self.store.list_tags()?;
        let mut resolved = 0usize;
        for release in &mut releases {
            if let Some(tag) = tags
                .iter()
                .find(|tag| release.version.matches_tag(&tag.name))
            {
                release.resolve(tag.target);
                resolved += 1;
            }
        }
        info!(
            total = releases.len(),
            resolved, "release catalog loaded"
        );

        let prefetcher = (self.config.prefetch_workers > 0).then(|| {
            let jobs: Vec<(String, String)> = releases
                .iter()
                .filter(|release| release.resolved_commit().is_none())
                .map(|release| (release.archive_url.clone(), release.filename.clone()))
                .collect();
            Prefetcher::spawn(
                Arc::clone(&fetcher),
                jobs,
                self.config.prefetch_workers,
                self.config.cancel.clone(),
            )
        });

        let chain = CommitChainBuilder::new(
            &self.store,
            fetcher.as_ref(),
            reader,
            self.config.identity.clone(),
            self.config.project.clone(),
            self.config.cancel.clone(),
        );
        let result = chain.build_chain(&mut releases);

        if let Some(prefetcher) = prefetcher {
            prefetcher.join();
        }
        let head = result?;

        self.store
            .force_update_branch(&self.config.latest_ref, head)?;
        info!(branch = %self.config.latest_ref, commit = %head.short(), "history updated");

        Ok(head)
    }
}

/// Bounded worker pool warming the fetcher's cache ahead of the build.
///
/// Fetching release i+1's archive does not depend on release i's
/// commit, so downloads may run ahead even though the build cannot.
/// Workers drain a shared job queue and stop early on cancellation.
struct Prefetcher {
    handles: Vec<thread::JoinHandle<()>>,
}

impl Prefetcher {
    fn spawn(
        fetcher: Arc<dyn ArchiveFetcher>,
        jobs: Vec<(String, String)>,
        workers: usize,
        cancel: CancelFlag,
    ) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let handles = (0..workers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let fetcher = Arc::clone(&fetcher);
                let cancel = cancel.clone();
                thread::spawn(move || loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let job = queue.lock().pop_front();
                    let Some((url, filename)) = job else { break };
                    if let Err(err) = fetcher.fetch(&url, &filename) {
                        // not fatal: the sequential build re-fetches
                        // and propagates the real error
                        warn!(%filename, error = %err, "prefetch failed");
                    }
                })
            })
            .collect();
        Self { handles }
    }

    fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

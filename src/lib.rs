//! chronicle - rebuilds a git commit history from published release archives
//!
//! Some projects were never version-controlled in public: each release
//! exists only as a downloadable archive on a web page. This crate turns
//! that ordered sequence of archive snapshots into a real git history -
//! one content-addressed tree and commit per release, chained
//! parent-to-child in chronological order, tagged `v<version>`, with a
//! `latest` branch pointing at the newest commit. Runs are idempotent:
//! releases whose tags already exist are skipped, so a failed or partial
//! run simply resumes next time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chronicle::archive::{HttpFetcher, TarGzReader};
//! use chronicle::catalog::ManifestCatalog;
//! use chronicle::history::HistoryUpdater;
//! use chronicle::store::GitStore;
//!
//! let store = GitStore::open_or_init("./history").unwrap();
//! let catalog = ManifestCatalog::new("https://downloads.example.com/releases.json");
//! let fetcher = Arc::new(HttpFetcher::new(std::env::temp_dir()).unwrap());
//!
//! let head = HistoryUpdater::new(store)
//!     .run(&catalog, fetcher, &TarGzReader::new())
//!     .unwrap();
//! println!("{head}");
//! ```

pub mod archive;
pub mod catalog;
pub mod history;
pub mod store;

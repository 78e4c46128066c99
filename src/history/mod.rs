//! the snapshot-to-history synthesis engine
//!
//! Given an ordered list of releases and a content-addressable store,
//! this module deterministically rebuilds a linear commit history:
//!
//! - [`build_tree`] turns one release archive's flat entry stream into
//!   a hierarchical tree object;
//! - [`CommitChainBuilder`] folds over the releases oldest-first,
//!   producing one commit and one tag per release and threading each
//!   commit as the next release's parent;
//! - [`HistoryUpdater`] orchestrates a full run: sort the catalog,
//!   pre-resolve releases whose tags already exist, fold the chain, and
//!   repoint the `latest` branch at the newest commit.
//!
//! Every error is fail-fast: the fold stops, and whatever was already
//! committed and tagged stays valid in the store. That is the whole
//! resumability story - a rerun pre-resolves the finished releases and
//! picks up where the failure happened.

mod chain;
mod error;
mod tree;
mod updater;

pub use chain::CommitChainBuilder;
pub use error::{HistoryError, HistoryResult};
pub use tree::build_tree;
pub use updater::{CancelFlag, HistoryUpdater, UpdaterConfig};

//! content-addressable store for the synthesized history
//!
//! this module is a thin, typed wrapper over git's object database. The
//! upper layers (tree building, commit chaining, orchestration) use this
//! API and never touch git2 directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     GitStore                        │
//! │  (blobs, trees, commits, tags, the "latest" branch) │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!                   git object database
//!            (content-addressed, write-once)
//! ```
//!
//! Every object is identified by the hash of its content: writing the
//! same bytes twice yields the same id and is a no-op in the odb. Tags
//! are the one non-idempotent surface — creating a tag whose name is
//! already taken is an error, and callers are expected to check
//! [`GitStore::tag_exists`] first.

mod error;
mod repository;
mod types;

pub use error::{StoreError, StoreResult};
pub use repository::{CommitInfo, GitStore};
pub use types::{BlobId, CommitId, Identity, TagRef, TreeId, TreeNode};

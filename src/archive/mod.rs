//! release archive access
//!
//! Two collaborator seams live here: [`ArchiveFetcher`] obtains archive
//! bytes (downloading once, caching by filename), and [`ArchiveReader`]
//! enumerates the file members of an archive as a lazy, single-pass
//! stream of [`ArchiveEntry`] values with the top-level container
//! directory stripped from every path.
//!
//! The shipped implementations are [`HttpFetcher`] (blocking HTTP into
//! a local cache directory) and [`TarGzReader`] (gzip-compressed
//! tarballs, decoded on a background thread). Both traits are object
//! safe so other transports and container formats can slot in.

mod entry;
mod error;
mod fetcher;
mod reader;

pub use entry::{ArchiveEntry, REGULAR_FILE_BIT};
pub use error::{ArchiveError, ArchiveResult};
pub use fetcher::{ArchiveFetcher, HttpFetcher};
pub use reader::{ArchiveEntries, ArchiveReader, TarGzReader};

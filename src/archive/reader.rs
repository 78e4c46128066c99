//! Streaming archive enumeration.
//!
//! A reader turns an archive file into a lazy, finite, single-pass
//! stream of [`ArchiveEntry`] values. [`TarGzReader`] decodes
//! gzip-compressed tarballs on a background thread and hands entries
//! over a bounded channel, so a whole archive is never held in memory.
//!
//! Path policy, applied per member:
//! - the single top-level container directory is stripped from every
//!   path ("pkg-1.0/lib/a.txt" becomes "lib/a.txt");
//! - directory members are skipped (file paths imply them);
//! - any other non-regular member (symlink, hard link, fifo, ...) fails
//!   the stream;
//! - a member not under the container directory fails the stream as
//!   malformed.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use tar::EntryType;

use crate::archive::entry::ArchiveEntry;
use crate::archive::error::{ArchiveError, ArchiveResult};

/// entries a decoder thread may run ahead of the consumer
const CHANNEL_DEPTH: usize = 16;

/// enumerates the file members of an archive
pub trait ArchiveReader: Send + Sync {
    /// Open the archive at `path` and stream its file members. The
    /// stream is single-pass; re-reading means re-opening the cached
    /// archive.
    fn entries(&self, path: &Path) -> ArchiveResult<ArchiveEntries>;
}

/// lazy, finite, single-pass stream of archive entries
pub struct ArchiveEntries {
    receiver: Receiver<ArchiveResult<ArchiveEntry>>,
}

impl ArchiveEntries {
    fn from_channel(receiver: Receiver<ArchiveResult<ArchiveEntry>>) -> Self {
        Self { receiver }
    }

    /// Build a stream from already-materialized results.
    ///
    /// Intended for in-memory readers and tests.
    pub fn from_results(results: Vec<ArchiveResult<ArchiveEntry>>) -> Self {
        let (sender, receiver) = mpsc::channel();
        for result in results {
            // receiver is alive until after this loop, sends cannot fail
            let _ = sender.send(result);
        }
        Self { receiver }
    }
}

impl Iterator for ArchiveEntries {
    type Item = ArchiveResult<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

/// reader for gzip-compressed tarballs
#[derive(Debug, Default)]
pub struct TarGzReader;

impl TarGzReader {
    /// create a tar.gz reader
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveReader for TarGzReader {
    fn entries(&self, path: &Path) -> ArchiveResult<ArchiveEntries> {
        let file = File::open(path)?;
        let path = path.to_path_buf();
        let (sender, receiver) = mpsc::sync_channel(CHANNEL_DEPTH);

        thread::spawn(move || {
            let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
            // a send error means the consumer hung up; just stop decoding
            let _ = stream_entries(&mut archive, &path, &sender);
        });

        Ok(ArchiveEntries::from_channel(receiver))
    }
}

/// drain the tar stream into the channel; Err means the receiver is gone
fn stream_entries<R: Read>(
    archive: &mut tar::Archive<R>,
    archive_path: &Path,
    sender: &SyncSender<ArchiveResult<ArchiveEntry>>,
) -> Result<(), ()> {
    let members = match archive.entries() {
        Ok(members) => members,
        Err(err) => {
            sender
                .send(Err(ArchiveError::read(archive_path, err)))
                .map_err(drop)?;
            return Ok(());
        }
    };

    for member in members {
        let result = decode_member(member, archive_path);
        match result {
            Ok(Some(entry)) => sender.send(Ok(entry)).map_err(drop)?,
            Ok(None) => continue,
            Err(err) => {
                // fail-fast: one bad member poisons the whole stream
                sender.send(Err(err)).map_err(drop)?;
                return Ok(());
            }
        }
    }
    Ok(())
}

/// decode one tar member; Ok(None) means "skip"
fn decode_member<R: Read>(
    member: std::io::Result<tar::Entry<'_, R>>,
    archive_path: &Path,
) -> ArchiveResult<Option<ArchiveEntry>> {
    let mut member = member.map_err(|err| ArchiveError::read(archive_path, err))?;

    match member.header().entry_type() {
        EntryType::Regular => {}
        EntryType::Directory => return Ok(None),
        other => {
            let path = member
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(ArchiveError::UnsupportedEntry {
                path,
                kind: format!("{other:?}"),
            });
        }
    }

    let raw_path = member
        .path()
        .map_err(|err| ArchiveError::read(archive_path, err))?
        .into_owned();
    let path = strip_container_dir(&raw_path, archive_path)?;

    let permissions = member
        .header()
        .mode()
        .map_err(|err| ArchiveError::read(archive_path, err))?
        & 0o7777;
    let modified_at = member
        .header()
        .mtime()
        .map(|secs| {
            DateTime::from_timestamp(secs as i64, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        })
        .map_err(|err| ArchiveError::read(archive_path, err))?;

    let mut content = Vec::with_capacity(member.size() as usize);
    member
        .read_to_end(&mut content)
        .map_err(|err| ArchiveError::read(archive_path, err))?;

    Ok(Some(ArchiveEntry::new(
        path,
        content,
        permissions,
        modified_at,
    )))
}

/// drop the leading container directory from a member path
fn strip_container_dir(raw: &PathBuf, archive_path: &Path) -> ArchiveResult<String> {
    let raw = raw.to_str().ok_or_else(|| {
        ArchiveError::read(archive_path, format!("non-utf8 member path {raw:?}"))
    })?;

    match raw.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => Ok(rest.trim_end_matches('/').to_string()),
        _ => Err(ArchiveError::read(
            archive_path,
            format!("member {raw:?} is not under a container directory"),
        )),
    }
}

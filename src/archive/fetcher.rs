//! Archive fetching with a local download cache.
//!
//! Archives are cached by filename: a present cache entry is reused
//! without validation, a missing one is downloaded exactly once. The
//! in-flight set keeps a prefetch thread and the sequential build from
//! downloading the same archive twice - the second caller waits for the
//! first download to land.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::archive::error::{ArchiveError, ArchiveResult};

/// obtains archive bytes and returns a local path to them
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch `url` into the cache under `filename`, downloading only if
    /// no cache entry exists yet. Returns the local path.
    fn fetch(&self, url: &str, filename: &str) -> ArchiveResult<PathBuf>;
}

/// HTTP fetcher with an on-disk cache keyed by filename
pub struct HttpFetcher {
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
    in_flight: Mutex<HashSet<String>>,
    landed: Condvar,
}

impl HttpFetcher {
    /// create a fetcher caching into `cache_dir` (created if missing)
    pub fn new(cache_dir: impl Into<PathBuf>) -> ArchiveResult<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            client: reqwest::blocking::Client::new(),
            in_flight: Mutex::new(HashSet::new()),
            landed: Condvar::new(),
        })
    }

    /// the directory downloads land in
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache keys become filenames, so anything that could traverse out
    /// of the cache directory is rejected.
    fn validate_filename(filename: &str) -> ArchiveResult<()> {
        let traverses = filename.contains('/') || filename.contains('\\');
        if filename.is_empty() || traverses || filename == "." || filename == ".." {
            return Err(ArchiveError::InvalidFilename(filename.to_string()));
        }
        Ok(())
    }

    /// block until no other thread is downloading `filename`, then mark
    /// it as ours
    fn claim(&self, filename: &str) {
        let mut in_flight = self.in_flight.lock();
        while in_flight.contains(filename) {
            self.landed.wait(&mut in_flight);
        }
        in_flight.insert(filename.to_string());
    }

    fn release(&self, filename: &str) {
        self.in_flight.lock().remove(filename);
        self.landed.notify_all();
    }

    /// download to a temp file in the cache dir, then rename into place
    /// so a cache entry is only ever observed complete
    fn download(&self, url: &str, filename: &str, dest: &Path) -> ArchiveResult<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| ArchiveError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let staging = self.cache_dir.join(format!("{filename}.part"));
        let result: ArchiveResult<()> = (|| {
            let mut file = File::create(&staging)?;
            response
                .copy_to(&mut file)
                .map_err(|source| ArchiveError::Fetch {
                    url: url.to_string(),
                    source,
                })?;
            fs::rename(&staging, dest)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, filename: &str) -> ArchiveResult<PathBuf> {
        Self::validate_filename(filename)?;
        let dest = self.cache_dir.join(filename);

        if dest.exists() {
            debug!(%filename, "archive cache hit");
            return Ok(dest);
        }

        self.claim(filename);
        // re-check: the download may have landed while we waited
        let result = if dest.exists() {
            debug!(%filename, "archive landed while waiting");
            Ok(())
        } else {
            info!(%url, %filename, "downloading archive");
            self.download(url, filename, &dest)
        };
        self.release(filename);

        result.map(|_| dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_hit_skips_network() {
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(dir.path()).unwrap();
        fs::write(dir.path().join("pkg-1.0.tar.gz"), b"cached bytes").unwrap();

        // the URL is unreachable; a hit must not touch it
        let path = fetcher
            .fetch("http://127.0.0.1:1/pkg-1.0.tar.gz", "pkg-1.0.tar.gz")
            .unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached bytes");
    }

    #[test]
    fn test_miss_on_unreachable_host_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(dir.path()).unwrap();

        let result = fetcher.fetch("http://127.0.0.1:1/pkg-1.0.tar.gz", "pkg-1.0.tar.gz");
        assert!(matches!(result, Err(ArchiveError::Fetch { .. })));
        // no stray staging file left behind
        assert!(!dir.path().join("pkg-1.0.tar.gz.part").exists());
    }

    #[test]
    fn test_filename_validation() {
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(dir.path()).unwrap();

        for bad in ["", ".", "..", "a/b.tar.gz", "..\\evil"] {
            let result = fetcher.fetch("http://example.com/x", bad);
            assert!(
                matches!(result, Err(ArchiveError::InvalidFilename(_))),
                "accepted {bad:?}"
            );
        }
    }
}

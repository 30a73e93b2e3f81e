// 📥 Fetch-or-cache - make sure a remote file exists locally before reading it
//
// Downloads land in a sibling temp file and are renamed onto the cache
// path only once complete, so a cached file is never a partial download.

use crate::error::DataSourceError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Streams the raw bytes behind a URL into `out`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<(), DataSourceError>;
}

/// Return `path`, first downloading `url` into it if it does not exist yet.
///
/// An existing file is never re-fetched or validated. On any failure
/// `path` is left absent and the temp file is removed.
pub fn ensure_local(
    path: &Path,
    url: &str,
    fetcher: &dyn Fetcher,
) -> Result<PathBuf, DataSourceError> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "using cached reference file");
        return Ok(path.to_path_buf());
    }

    tracing::info!(%url, path = %path.display(), "downloading reference file");

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    let io_error = |at: &Path| {
        let at = at.to_path_buf();
        move |source| DataSourceError::Io { path: at, source }
    };

    fs::create_dir_all(parent).map_err(io_error(parent))?;
    let mut partial = NamedTempFile::new_in(parent).map_err(io_error(parent))?;

    // Dropping `partial` on an early return deletes it.
    fetcher.fetch(url, partial.as_file_mut())?;
    partial.as_file_mut().sync_all().map_err(io_error(partial.path()))?;
    partial
        .persist(path)
        .map_err(|e| DataSourceError::Io {
            path: path.to_path_buf(),
            source: e.error,
        })?;

    Ok(path.to_path_buf())
}

// ============================================================================
// HTTP FETCHER
// ============================================================================

#[cfg(feature = "http")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Result<Self, DataSourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("censuscodes/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataSourceError::ClientInit(e.to_string()))?;
        Ok(HttpFetcher { client })
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<(), DataSourceError> {
        let mut response = self.client.get(url).send().map_err(|e| DataSourceError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.copy_to(out).map_err(|e| DataSourceError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned bodies by URL and counts every call.
    pub(crate) struct StubFetcher {
        pub bodies: HashMap<String, Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl StubFetcher {
        pub fn new(bodies: &[(&str, &str)]) -> Self {
            StubFetcher {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<(), DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.bodies.get(url).ok_or_else(|| DataSourceError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })?;
            out.write_all(body).map_err(|e| DataSourceError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
        }
    }

    /// Writes the first half of its body, then fails mid-transfer.
    struct TruncatingFetcher {
        body: Vec<u8>,
    }

    impl Fetcher for TruncatingFetcher {
        fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<(), DataSourceError> {
            out.write_all(&self.body[..self.body.len() / 2])
                .map_err(|e| DataSourceError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            Err(DataSourceError::Fetch {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            })
        }
    }

    #[test]
    fn test_missing_file_is_downloaded_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/resources/states.txt");
        let fetcher = StubFetcher::new(&[("https://example.org/states.txt", "STATE|STATEFP\n")]);

        let local = ensure_local(&path, "https://example.org/states.txt", &fetcher).unwrap();

        assert_eq!(local, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "STATE|STATEFP\n");
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_existing_file_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.txt");
        fs::write(&path, "cached").unwrap();
        let fetcher = StubFetcher::new(&[]);

        let local = ensure_local(&path, "https://example.org/states.txt", &fetcher).unwrap();

        assert_eq!(local, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "cached");
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_interrupted_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.txt");
        let fetcher = TruncatingFetcher {
            body: b"STATE|STATEFP|STATENS|STATE_NAME\nNY|36|01779796|New York\n".to_vec(),
        };

        let err = ensure_local(&path, "https://example.org/states.txt", &fetcher).unwrap_err();

        assert!(matches!(err, DataSourceError::Fetch { .. }));
        assert!(!path.exists());
        // The temp file is cleaned up too.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        // The next run downloads again instead of trusting a short file.
        let good = StubFetcher::new(&[(
            "https://example.org/states.txt",
            "STATE|STATEFP|STATENS|STATE_NAME\nNY|36|01779796|New York\nNJ|34|01779795|New Jersey\n",
        )]);
        ensure_local(&path, "https://example.org/states.txt", &good).unwrap();
        assert_eq!(good.calls(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_failed_fetch_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.txt");
        let fetcher = StubFetcher::new(&[]);

        let err = ensure_local(&path, "https://example.org/missing.txt", &fetcher).unwrap_err();

        assert!(matches!(err, DataSourceError::HttpStatus { status: 404, .. }));
        assert!(!path.exists());
    }
}

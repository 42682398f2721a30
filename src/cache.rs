//! On-disk image cache.
//!
//! Page rendering only ever reads from the cache through [`DiskCache`]. The
//! directory-backed [`DirCache`] and [`prefetch`] exist so the CLI can fill it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use futures::future::join_all;

/// Maps a remote URL to a locally stored copy, if there is one.
pub trait DiskCache: Send + Sync {
    fn lookup(&self, url: &str) -> io::Result<Option<PathBuf>>;
}

/// Cache that stores one file per URL, named by the BLAKE3 hash of the URL.
#[derive(Debug, Clone)]
pub struct DirCache {
    dir: PathBuf,
}

impl DirCache {
    /// Open (or create) a cache rooted at `dir`.
    ///
    /// The directory is made absolute so returned paths can be used as
    /// `file://` URLs.
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        let dir = fs::canonicalize(dir)
            .with_context(|| format!("Failed to resolve cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location a URL is (or would be) stored at.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }

    /// Store `bytes` for `url`, replacing any previous copy.
    ///
    /// Writes to a temp file and renames so readers never see a partial file.
    pub fn store(&self, url: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(url);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;
        Ok(path)
    }
}

impl DiskCache for DirCache {
    fn lookup(&self, url: &str) -> io::Result<Option<PathBuf>> {
        let path = self.path_for(url);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// File name for a cached URL.
pub fn cache_key(url: &str) -> String {
    blake3::hash(url.as_bytes()).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Prefetch
// ---------------------------------------------------------------------------

/// Outcome of a [`prefetch`] run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrefetchReport {
    /// URLs downloaded and written to the cache.
    pub stored: usize,
    /// URLs already cached or not downloadable (data:, relative, ...).
    pub skipped: usize,
    /// URLs whose download or write failed.
    pub failed: usize,
}

/// The http(s) URL to download for a link, or `None` if it can't be fetched.
///
/// Protocol-relative links are fetched over https but cached under the
/// original text, since that is what the page body will be searched for.
pub fn download_url(link: &str) -> Option<String> {
    if link.starts_with("//") {
        Some(format!("https:{link}"))
    } else if link.starts_with("http://") || link.starts_with("https://") {
        Some(link.to_string())
    } else {
        None
    }
}

/// Download every URL in `urls` that is not cached yet.
///
/// Failures are logged and counted; they never abort the run.
pub async fn prefetch(client: &reqwest::Client, cache: &DirCache, urls: &[String]) -> PrefetchReport {
    let mut report = PrefetchReport::default();
    let mut pending: Vec<(String, String)> = Vec::new();

    for url in urls {
        let url = url.trim();
        let already_cached = matches!(cache.lookup(url), Ok(Some(_)));
        match download_url(url) {
            Some(remote) if !already_cached && !pending.iter().any(|(u, _)| u == url) => {
                pending.push((url.to_string(), remote));
            }
            _ => report.skipped += 1,
        }
    }

    let results = join_all(
        pending
            .into_iter()
            .map(|(url, remote)| fetch_into_cache(client, cache, url, remote)),
    )
    .await;

    for ok in results {
        if ok {
            report.stored += 1;
        } else {
            report.failed += 1;
        }
    }

    tracing::debug!(?report, "prefetch finished");
    report
}

async fn fetch_into_cache(client: &reqwest::Client, cache: &DirCache, url: String, remote: String) -> bool {
    match download(client, &remote).await {
        Ok(bytes) => {
            let cache = cache.clone();
            let key = url.clone();
            let stored = tokio::task::spawn_blocking(move || cache.store(&key, &bytes)).await;
            match stored {
                Ok(Ok(path)) => {
                    tracing::debug!(url = %url, path = %path.display(), "cached image");
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!(url = %url, error = %e, "failed to write cached image");
                    false
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "cache writer task failed");
                    false
                }
            }
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "failed to download image");
            false
        }
    }
}

async fn download(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<u8>> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {}", status.as_u16());
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        anyhow::bail!("Empty response");
    }

    Ok(bytes.to_vec())
}

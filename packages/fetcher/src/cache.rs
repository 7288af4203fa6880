//! Content-addressed on-disk cache of GET responses.
//!
//! The cache key is the URL string. Bodies are stored under their host
//! name and the SHA-1 of the URL, which sidesteps escaping URLs into file
//! names:
//!
//! ```text
//! cache/
//!   urls.txt                 <sha1>\t<url>, one line per write
//!   www.example.com/<sha1>
//!   localhost:8080/<sha1>
//! ```
//!
//! `urls.txt` is append-only. Removing a body leaves its line behind;
//! re-storing the same URL appends a duplicate line. Both are harmless.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use sha1::{Digest as _, Sha1};

use crate::FetchError;

/// File name of the append-only URL index inside the cache directory.
pub const URLS_FILE_NAME: &str = "urls.txt";

/// Returns the lowercase hex SHA-1 of `url`'s UTF-8 bytes.
#[must_use]
pub fn url_hash(url: &str) -> String {
    hex::encode(Sha1::digest(url.as_bytes()))
}

/// Returns the `host[:port]` directory name for `url`.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if the URL cannot be parsed or has
/// no host.
pub fn host_dir_name(url: &str) -> Result<String, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl {
        url: url.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| FetchError::InvalidUrl {
        url: url.to_string(),
    })?;
    Ok(parsed
        .port()
        .map_or_else(|| host.to_string(), |port| format!("{host}:{port}")))
}

/// Response bodies keyed by URL.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    urls_file: PathBuf,
}

impl Cache {
    /// Opens (or creates) a cache rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| FetchError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let urls_file = dir.join(URLS_FILE_NAME);
        Ok(Self { dir, urls_file })
    }

    /// The cache root.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a URL's body is (or would be) stored at.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the URL has no host.
    pub fn entry_path(&self, url: &str) -> Result<PathBuf, FetchError> {
        Ok(self.dir.join(host_dir_name(url)?).join(url_hash(url)))
    }

    /// Whether a body is stored for `url`.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entry_path(url).is_ok_and(|path| path.is_file())
    }

    /// Reads the stored body for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotInCache`] if nothing is stored for `url`,
    /// or [`FetchError::Io`] if the entry exists but cannot be read.
    pub fn read(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.entry_path(url)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotInCache {
                url: url.to_string(),
            }),
            Err(source) => Err(FetchError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Stores `contents` for `url` and appends the URL to the index.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the body or index cannot be written.
    pub fn store(&self, url: &str, contents: &[u8]) -> Result<(), FetchError> {
        let path = self.entry_path(url)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| FetchError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(&path, contents).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.urls_file)
            .map_err(|source| self.index_error(source))?;
        writeln!(index, "{}\t{url}", url_hash(url)).map_err(|source| self.index_error(source))?;

        Ok(())
    }

    /// Deletes the stored body for `url`, if any. The index line stays.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if an existing entry cannot be deleted.
    pub fn remove(&self, url: &str) -> Result<(), FetchError> {
        let path = self.entry_path(url)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FetchError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn index_error(&self, source: std::io::Error) -> FetchError {
        FetchError::Io {
            path: self.urls_file.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(name: &str) -> Cache {
        let dir = std::env::temp_dir().join(format!("oldto_cache_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        Cache::open(dir).unwrap()
    }

    #[test]
    fn hashes_url_with_sha1() {
        assert_eq!(
            url_hash("https://www.example.com/a?b=1"),
            "6bc433a3583118c7d0349e971b2cc3bc285aa1ef"
        );
    }

    #[test]
    fn lays_out_entries_by_host_and_hash() {
        let cache = temp_cache("layout");
        let path = cache.entry_path("http://localhost:8080/x").unwrap();
        assert_eq!(
            path,
            cache
                .dir()
                .join("localhost:8080")
                .join("579d4728ac12e291b19e27f7fc32c7eeefd4bf17")
        );
        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn rejects_urls_without_host() {
        let cache = temp_cache("no_host");
        assert!(matches!(
            cache.entry_path("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(!cache.contains("not a url"));
        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn store_read_remove_cycle() {
        let cache = temp_cache("cycle");
        let url = "https://www.example.com/a?b=1";

        assert!(!cache.contains(url));
        assert!(matches!(
            cache.read(url),
            Err(FetchError::NotInCache { .. })
        ));

        cache.store(url, b"hello").unwrap();
        assert!(cache.contains(url));
        assert_eq!(cache.read(url).unwrap(), b"hello");

        cache.remove(url).unwrap();
        assert!(!cache.contains(url));
        // Removing twice is fine.
        cache.remove(url).unwrap();

        let index = std::fs::read_to_string(cache.dir().join(URLS_FILE_NAME)).unwrap();
        assert_eq!(
            index,
            "6bc433a3583118c7d0349e971b2cc3bc285aa1ef\thttps://www.example.com/a?b=1\n"
        );
        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn index_is_append_only() {
        let cache = temp_cache("append");
        let url = "https://www.example.com/a?b=1";
        cache.store(url, b"one").unwrap();
        cache.remove(url).unwrap();
        cache.store(url, b"two").unwrap();

        let index = std::fs::read_to_string(cache.dir().join(URLS_FILE_NAME)).unwrap();
        assert_eq!(index.lines().count(), 2);
        assert_eq!(cache.read(url).unwrap(), b"two");
        let _ = std::fs::remove_dir_all(cache.dir());
    }
}

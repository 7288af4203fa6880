#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rate-limited HTTP fetcher backed by a persistent disk cache.
//!
//! Used by the geocoding transport and by anything that scrapes archive
//! pages. A cache hit never touches the network. A miss issues a GET,
//! but only after the minimum interval since the previous network call
//! has elapsed; the body is written to the [`cache::Cache`] before it is
//! returned.
//!
//! The cache assumes a single writer: one fetch process at a time.

pub mod cache;

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub use cache::Cache;

/// Minimum interval between network requests unless configured otherwise.
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(3);

/// Per-request timeout applied to the default `reqwest` client.
const REQUEST_TIMEOUT: Duration = Duration::from_mins(2);

/// Errors from fetch and cache operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A read-only cache lookup found nothing.
    #[error("Not in cache: {url}")]
    NotInCache {
        /// The URL that was looked up.
        url: String,
    },

    /// The URL could not be parsed or has no host.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// The HTTP request failed before a status was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A cache file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// The network side of the fetcher: a plain GET returning the body.
///
/// Implemented for [`reqwest::Client`]; tests substitute a counting mock.
pub trait HttpClient: Send + Sync {
    /// Issues a GET for `url` and returns the body of a 2xx response.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for non-2xx responses and
    /// [`FetchError::Http`] for transport failures.
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

impl HttpClient for reqwest::Client {
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let request = Self::get(self, url);
        let url = url.to_string();
        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }
            Ok(response.bytes().await?.to_vec())
        }
    }
}

/// Throttled, cached GET requests.
#[derive(Debug)]
pub struct Fetcher<C = reqwest::Client> {
    cache: Cache,
    client: C,
    throttle: Duration,
    last_fetch: Mutex<Option<Instant>>,
}

impl Fetcher<reqwest::Client> {
    /// Creates a fetcher with a default `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the cache directory cannot be created or
    /// the HTTP client cannot be built.
    pub fn new(
        cache_dir: impl Into<std::path::PathBuf>,
        throttle: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(Cache::open(cache_dir)?, client, throttle))
    }
}

impl<C: HttpClient> Fetcher<C> {
    /// Creates a fetcher over an existing cache and HTTP client.
    #[must_use]
    pub const fn with_client(cache: Cache, client: C, throttle: Duration) -> Self {
        Self {
            cache,
            client,
            throttle,
            last_fetch: Mutex::new(None),
        }
    }

    /// The underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Returns the body for `url`, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the network request fails, the server
    /// answers with a non-2xx status, or the cache cannot be written.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_url(url, false).await
    }

    /// Returns the body for `url`. With `force_refetch`, any cached entry
    /// is deleted first so the network is always consulted.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::fetch`].
    pub async fn fetch_url(&self, url: &str, force_refetch: bool) -> Result<Vec<u8>, FetchError> {
        self.fetch_keyed(url, url, force_refetch).await
    }

    /// Like [`Fetcher::fetch_url`], but the body is cached under `key`
    /// rather than under the request URL.
    ///
    /// Lets callers keep credentials carried in the query string out of the
    /// cache layout and `urls.txt`. `key` must itself be a URL with a host.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::fetch`].
    pub async fn fetch_keyed(
        &self,
        key: &str,
        url: &str,
        force_refetch: bool,
    ) -> Result<Vec<u8>, FetchError> {
        if force_refetch {
            self.cache.remove(key)?;
        }

        match self.cache.read(key) {
            Ok(bytes) => return Ok(bytes),
            Err(FetchError::NotInCache { .. }) => {}
            Err(e) => return Err(e),
        }

        if let Some(wait) = self.remaining_wait() {
            log::info!("Waiting {:.2} secs...", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }

        log::info!("Fetching {key}...");
        let result = self.client.fetch_bytes(url).await;
        self.mark_fetched();

        let contents = result?;
        self.cache.store(key, &contents)?;
        Ok(contents)
    }

    /// Whether a body is cached for `url`.
    #[must_use]
    pub fn is_cached(&self, url: &str) -> bool {
        self.cache.contains(url)
    }

    /// Reads `url` from the cache only.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotInCache`] if nothing is stored.
    pub fn fetch_from_cache(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.cache.read(url)
    }

    /// Deletes the cached body for `url`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the entry cannot be deleted.
    pub fn remove_from_cache(&self, url: &str) -> Result<(), FetchError> {
        self.cache.remove(url)
    }

    /// Time left before the next network call may start.
    fn remaining_wait(&self) -> Option<Duration> {
        let last = *self.last_fetch();
        last.and_then(|at| self.throttle.checked_sub(at.elapsed()))
            .filter(|wait| !wait.is_zero())
    }

    fn mark_fetched(&self) {
        *self.last_fetch() = Some(Instant::now());
    }

    fn last_fetch(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_fetch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockClient {
        calls: AtomicUsize,
        status: Option<u16>,
    }

    impl MockClient {
        const fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status: None,
            }
        }

        const fn failing(status: u16) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status: Some(status),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for MockClient {
        fn fetch_bytes(
            &self,
            url: &str,
        ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let result = self.status.map_or_else(
                || Ok(format!("{url} #{n}").into_bytes()),
                |status| {
                    Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                    })
                },
            );
            async move { result }
        }
    }

    fn temp_fetcher(name: &str, client: MockClient, throttle: Duration) -> Fetcher<MockClient> {
        let dir = std::env::temp_dir().join(format!("oldto_fetcher_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        Fetcher::with_client(Cache::open(dir).unwrap(), client, throttle)
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let fetcher = temp_fetcher("idempotent", MockClient::ok(), Duration::ZERO);
        let url = "https://www.example.com/page";

        let first = fetcher.fetch(url).await.unwrap();
        let second = fetcher.fetch(url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.client.calls(), 1);
        assert!(fetcher.is_cached(url));
        let _ = std::fs::remove_dir_all(fetcher.cache().dir());
    }

    #[tokio::test]
    async fn force_refetch_goes_back_to_the_network() {
        let fetcher = temp_fetcher("force", MockClient::ok(), Duration::ZERO);
        let url = "https://www.example.com/page";

        let first = fetcher.fetch(url).await.unwrap();
        let refreshed = fetcher.fetch_url(url, true).await.unwrap();

        assert_eq!(fetcher.client.calls(), 2);
        assert_ne!(first, refreshed);
        assert_eq!(fetcher.fetch_from_cache(url).unwrap(), refreshed);
        let _ = std::fs::remove_dir_all(fetcher.cache().dir());
    }

    #[tokio::test]
    async fn error_status_is_not_cached() {
        let fetcher = temp_fetcher("status", MockClient::failing(404), Duration::ZERO);
        let url = "https://www.example.com/missing";

        let err = fetcher.fetch(url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!fetcher.is_cached(url));
        assert!(matches!(
            fetcher.fetch_from_cache(url),
            Err(FetchError::NotInCache { .. })
        ));
        let _ = std::fs::remove_dir_all(fetcher.cache().dir());
    }

    #[tokio::test]
    async fn misses_are_spaced_by_the_throttle() {
        let throttle = Duration::from_millis(200);
        let fetcher = temp_fetcher("throttle", MockClient::ok(), throttle);

        let start = Instant::now();
        fetcher.fetch("https://www.example.com/1").await.unwrap();
        fetcher.fetch("https://www.example.com/2").await.unwrap();
        assert!(start.elapsed() >= throttle);

        // Cache hits do not wait.
        let hit_start = Instant::now();
        fetcher.fetch("https://www.example.com/1").await.unwrap();
        assert!(hit_start.elapsed() < throttle);
        assert_eq!(fetcher.client.calls(), 2);
        let _ = std::fs::remove_dir_all(fetcher.cache().dir());
    }

    #[tokio::test]
    async fn keyed_fetch_caches_under_the_key() {
        let fetcher = temp_fetcher("keyed", MockClient::ok(), Duration::ZERO);
        let key = "https://www.example.com/page?q=1";
        let url = "https://www.example.com/page?q=1&token=hunter2";

        let body = fetcher.fetch_keyed(key, url, false).await.unwrap();
        assert_eq!(body, format!("{url} #1").into_bytes());
        assert!(fetcher.is_cached(key));
        assert!(!fetcher.is_cached(url));

        fetcher.fetch_keyed(key, url, false).await.unwrap();
        assert_eq!(fetcher.client.calls(), 1);
        let index =
            std::fs::read_to_string(fetcher.cache().dir().join(cache::URLS_FILE_NAME)).unwrap();
        assert!(!index.contains("hunter2"));
        let _ = std::fs::remove_dir_all(fetcher.cache().dir());
    }

    #[tokio::test]
    async fn remove_from_cache_forces_a_miss() {
        let fetcher = temp_fetcher("remove", MockClient::ok(), Duration::ZERO);
        let url = "https://www.example.com/page";
        fetcher.fetch(url).await.unwrap();
        fetcher.remove_from_cache(url).unwrap();
        assert!(!fetcher.is_cached(url));
        fetcher.fetch(url).await.unwrap();
        assert_eq!(fetcher.client.calls(), 2);
        let _ = std::fs::remove_dir_all(fetcher.cache().dir());
    }
}

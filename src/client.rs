use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

use crate::{
    cache::DiskCache,
    retry::retry_with_backoff,
    FetchError, FetchPlan, FetchRequest, Result,
};

/// Outcome of a single network attempt, consumed by the retry loop.
///
/// Both variants are transient by definition: the retrier logs and swallows
/// them, so neither ever reaches a caller.
enum AttemptError {
    /// The server answered with a non-success status.
    Status(reqwest::StatusCode),
    /// The request never produced a usable response (connect failure,
    /// timeout, interrupted body).
    Transport(reqwest::Error),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "http status {status}"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}

/// Fetches image payloads over HTTP with retry and optional disk caching.
///
/// The fetcher is cheap to clone: clones share one connection pool and one
/// cache, so a single instance can serve many concurrent loads.
#[derive(Clone, Debug)]
pub struct ImageFetcher {
    http: reqwest::Client,
    cache: DiskCache,
}

impl ImageFetcher {
    /// Fetcher caching under `<platform temp dir>/imagecache`.
    pub fn new() -> Self {
        Self::with_cache(DiskCache::in_temp_dir())
    }

    /// Fetcher caching under an explicit root directory.
    pub fn with_cache_root(root: impl Into<PathBuf>) -> Self {
        Self::with_cache(DiskCache::new(root))
    }

    /// Fetcher using a pre-built cache.
    pub fn with_cache(cache: DiskCache) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache,
        }
    }

    /// Resolves a request into its de-duplication identity.
    ///
    /// Value-equal requests resolve to equal plans; callers that key
    /// in-flight loads by plan will issue one load per distinct resource.
    pub fn resolve(&self, request: &FetchRequest) -> FetchPlan {
        FetchPlan::new(request.clone())
    }

    /// Loads the bytes a plan resolves to. Equivalent to
    /// [`fetch`](Self::fetch) on the plan's request.
    pub async fn load(&self, plan: &FetchPlan) -> Result<Bytes> {
        self.fetch(plan.request()).await
    }

    /// Where the request's cache entry lives, or `None` when the request
    /// does not use the disk cache. The file may or may not exist yet.
    pub fn cached_path(&self, request: &FetchRequest) -> Option<PathBuf> {
        request
            .use_disk_cache
            .then(|| self.cache.entry_path(&request.url))
    }

    /// Fetches the request's bytes from cache or network.
    ///
    /// With `use_disk_cache` set, an existing entry is served without any
    /// network traffic; on a miss the bytes are fetched and the entry is
    /// written before they are returned. Without it, the network is hit
    /// directly.
    ///
    /// When every attempt fails the failure callback fires, then the
    /// fallback image is returned if one is configured; otherwise the fetch
    /// ends in [`FetchError::Exhausted`]. On success the success callback
    /// fires first.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Bytes> {
        let fetched = if request.use_disk_cache {
            self.read_or_fetch(request).await?
        } else {
            self.fetch_remote(request).await
        };

        match fetched {
            Some(bytes) => {
                if let Some(on_success) = &request.on_success {
                    on_success();
                }
                Ok(bytes)
            }
            None => {
                if let Some(on_failure) = &request.on_failure {
                    on_failure();
                }
                match &request.fallback_image {
                    Some(fallback) => Ok(fallback.clone()),
                    None => Err(FetchError::Exhausted {
                        url: request.url.clone(),
                    }),
                }
            }
        }
    }

    /// Serves the cache entry if present, otherwise fetches and writes it.
    ///
    /// The whole sequence holds the entry's in-flight lock, so concurrent
    /// misses for one URL perform a single network fetch; late arrivals
    /// find the freshly written entry on their re-read.
    async fn read_or_fetch(&self, request: &FetchRequest) -> Result<Option<Bytes>> {
        let lock = self.cache.entry_lock(&request.url);
        let fetched = {
            let _guard = lock.lock().await;
            self.serve_or_populate(request).await
        };
        drop(lock);
        self.cache.evict_entry_lock(&request.url);
        fetched
    }

    async fn serve_or_populate(&self, request: &FetchRequest) -> Result<Option<Bytes>> {
        if let Some(bytes) = self.cache.read(&request.url).await? {
            tracing::debug!(url = %request.url, "serving cached image");
            return Ok(Some(bytes));
        }

        match self.fetch_remote(request).await {
            Some(bytes) => {
                self.cache.write(&request.url, &bytes).await?;
                Ok(Some(bytes))
            }
            // No entry is written on failure, so the next request for this
            // URL starts from scratch.
            None => Ok(None),
        }
    }

    /// One retried network fetch: `None` once every attempt has failed.
    async fn fetch_remote(&self, request: &FetchRequest) -> Option<Bytes> {
        // Negative limits behave as "no retries", one attempt total.
        let retry_limit = request.retry_limit.max(0) as u32;
        retry_with_backoff(
            || self.attempt(request),
            retry_limit,
            request.retry_duration,
            request.retry_duration_factor,
        )
        .await
    }

    /// A single GET attempt: success statuses yield the body bytes,
    /// everything else is an [`AttemptError`] for the retrier to absorb.
    async fn attempt(&self, request: &FetchRequest) -> std::result::Result<Bytes, AttemptError> {
        let mut builder = self.http.get(&request.url).timeout(request.timeout);
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let response = builder.send().await.map_err(AttemptError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }
        response.bytes().await.map_err(AttemptError::Transport)
    }
}

impl Default for ImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

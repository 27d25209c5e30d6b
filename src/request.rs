use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

/// Fire-and-forget lifecycle callback; its return value is never observed.
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Configuration for one image fetch.
///
/// A request is an immutable value: build one with [`FetchRequest::new`] and
/// the `with_*` methods, then hand it to
/// [`ImageFetcher`](crate::ImageFetcher).
///
/// # Equality and hashing
///
/// Two requests are equal iff `url`, `scale`, `headers`, `use_disk_cache`,
/// `retry_limit` and `retry_duration` are equal. `timeout`,
/// `fallback_image` and the lifecycle callbacks are deliberately excluded:
/// they change how a fetch behaves, not which resource it names, so they do
/// not belong in a de-duplication identity. Hashing is consistent with
/// equality.
#[derive(Clone)]
pub struct FetchRequest {
    /// URL of the image resource.
    pub url: String,
    /// Display scale hint carried alongside the request (default 1.0).
    pub scale: f32,
    /// Extra HTTP headers sent with every attempt.
    pub headers: Option<BTreeMap<String, String>>,
    /// Whether to consult and populate the disk cache (default false).
    pub use_disk_cache: bool,
    /// Retries after the initial attempt (default 5). Negative values are
    /// floored to 0 at fetch time.
    pub retry_limit: i32,
    /// Delay before the first retry (default 500 ms).
    pub retry_duration: Duration,
    /// Multiplier applied to the delay after each failed attempt
    /// (default 1.5, must be >= 1).
    pub retry_duration_factor: f64,
    /// Per-attempt HTTP timeout (default 5 s).
    pub timeout: Duration,
    /// Bytes yielded instead of an error when every attempt fails.
    pub fallback_image: Option<Bytes>,
    /// Invoked once when a fetch produced bytes from cache or network.
    pub on_success: Option<LifecycleCallback>,
    /// Invoked once when every attempt failed, before the fallback applies.
    pub on_failure: Option<LifecycleCallback>,
}

impl FetchRequest {
    /// Creates a request for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scale: 1.0,
            headers: None,
            use_disk_cache: false,
            retry_limit: 5,
            retry_duration: Duration::from_millis(500),
            retry_duration_factor: 1.5,
            timeout: Duration::from_secs(5),
            fallback_image: None,
            on_success: None,
            on_failure: None,
        }
    }

    /// Sets the display scale hint.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets headers sent with every network attempt.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Enables or disables the disk cache for this request.
    pub fn with_disk_cache(mut self, use_disk_cache: bool) -> Self {
        self.use_disk_cache = use_disk_cache;
        self
    }

    /// Sets the number of retries after the initial attempt.
    pub fn with_retry_limit(mut self, retry_limit: i32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_retry_duration(mut self, retry_duration: Duration) -> Self {
        self.retry_duration = retry_duration;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_retry_duration_factor(mut self, factor: f64) -> Self {
        self.retry_duration_factor = factor;
        self
    }

    /// Sets the per-attempt HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the bytes returned when every attempt fails.
    pub fn with_fallback_image(mut self, bytes: impl Into<Bytes>) -> Self {
        self.fallback_image = Some(bytes.into());
        self
    }

    /// Sets the success callback.
    pub fn with_on_success(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Sets the failure callback.
    pub fn with_on_failure(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(callback));
        self
    }
}

impl PartialEq for FetchRequest {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.scale.to_bits() == other.scale.to_bits()
            && self.headers == other.headers
            && self.use_disk_cache == other.use_disk_cache
            && self.retry_limit == other.retry_limit
            && self.retry_duration == other.retry_duration
    }
}

impl Eq for FetchRequest {}

impl Hash for FetchRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.scale.to_bits().hash(state);
        self.headers.hash(state);
        self.use_disk_cache.hash(state);
        self.retry_limit.hash(state);
        self.retry_duration.hash(state);
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url)
            .field("scale", &self.scale)
            .field("headers", &self.headers)
            .field("use_disk_cache", &self.use_disk_cache)
            .field("retry_limit", &self.retry_limit)
            .field("retry_duration", &self.retry_duration)
            .field("retry_duration_factor", &self.retry_duration_factor)
            .field("timeout", &self.timeout)
            .field(
                "fallback_image",
                &self.fallback_image.as_ref().map(Bytes::len),
            )
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Deterministic identity of a request, produced by
/// [`ImageFetcher::resolve`](crate::ImageFetcher::resolve).
///
/// Value-equal requests resolve to equal plans, so callers can use a plan as
/// a map key to de-duplicate concurrent loads of the same resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchPlan {
    request: FetchRequest,
}

impl FetchPlan {
    pub(crate) fn new(request: FetchRequest) -> Self {
        Self { request }
    }

    /// The request this plan was resolved from.
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }
}

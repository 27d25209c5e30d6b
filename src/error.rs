/// Error type returned by this crate.
///
/// Transient failures (non-success statuses, transport errors, timeouts)
/// never appear here: they are absorbed and retried inside the fetch loop.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Every network attempt failed and the request carries no fallback image.
    #[error("fetch failed after retries and no fallback image is configured: {url}")]
    Exhausted {
        /// URL of the resource that could not be fetched.
        url: String,
    },
    /// Cache directory or cache file I/O error.
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),
}

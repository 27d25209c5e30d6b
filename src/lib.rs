//! `pixfetch` fetches binary image payloads over HTTP with two concerns
//! layered on top of the raw GET:
//!
//! - bounded exponential-backoff retry around every network attempt, so
//!   transient failures (timeouts, non-success statuses, transport errors)
//!   do not surface immediately
//! - an optional disk cache keyed by a stable fingerprint of the URL, so
//!   repeated requests for the same resource skip the network entirely
//!
//! The crate returns raw bytes; decoding them into a displayable image is
//! the caller's concern.
//!
//! ```no_run
//! use pixfetch::{FetchRequest, ImageFetcher};
//!
//! # async fn example() -> pixfetch::Result<()> {
//! let fetcher = ImageFetcher::new();
//! let request = FetchRequest::new("https://img.example/logo.png")
//!     .with_disk_cache(true)
//!     .with_retry_limit(3);
//! let bytes = fetcher.fetch(&request).await?;
//! # drop(bytes);
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
mod error;
mod request;
mod retry;

pub use cache::DiskCache;
pub use client::ImageFetcher;
pub use error::FetchError;
pub use request::{FetchPlan, FetchRequest, LifecycleCallback};

pub type Result<T> = std::result::Result<T, FetchError>;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Delay inserted after failed attempt `attempt` (1-based):
/// `base * factor^(attempt - 1)`, so attempt 1's failure waits exactly
/// `base`.
///
/// The product saturates at [`Duration::MAX`]: large factors or deep attempt
/// counts must not panic mid-fetch.
pub(crate) fn backoff_delay(base: Duration, factor: f64, attempt: u32) -> Duration {
    let scaled = base.as_secs_f64() * factor.powi(attempt as i32 - 1);
    Duration::try_from_secs_f64(scaled).unwrap_or(Duration::MAX)
}

/// Drives `operation` up to `retry_limit + 1` times with exponential backoff
/// between failed attempts.
///
/// Attempt errors are logged and swallowed here; callers see only the first
/// successful value, or `None` once every attempt has failed. There is no
/// sleep after the final failed attempt.
pub(crate) async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    retry_limit: u32,
    base_delay: Duration,
    factor: f64,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let attempts = retry_limit.saturating_add(1);
    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Some(value),
            Err(err) => {
                tracing::debug!(attempt, "fetch attempt failed: {err}");
                if attempt < attempts {
                    sleep(backoff_delay(base_delay, factor, attempt)).await;
                }
            }
        }
    }

    if retry_limit > 0 {
        tracing::warn!("retries exhausted after {attempts} attempts");
    }
    None
}

//! Bounded exponential backoff for search and page requests.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::SearchError;

/// Hard ceiling on retries regardless of configuration
pub const MAX_RETRIES_CEILING: u32 = 3;

/// Runs `operation`, retrying retriable [`SearchError`]s with exponential backoff.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)` seconds.
/// `max_retries` is clamped to [`MAX_RETRIES_CEILING`], so an operation runs at
/// most four times. Non-retriable errors return immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, SearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    let max_retries = max_retries.min(MAX_RETRIES_CEILING);
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retriable() || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt);
        warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient search error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

//! Retry loop with exponential backoff for transient fetch errors.
//!
//! Non-retryable errors (parse failures, API rejections, malformed URLs)
//! propagate immediately without sleeping.

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

/// Minimum sleep between attempts, in seconds.
const BACKOFF_FLOOR_SECS: u64 = 2;
/// Maximum sleep between attempts, in seconds.
const BACKOFF_CEILING_SECS: u64 = 30;

/// Executes `operation` up to `max_attempts` times total, sleeping between
/// attempts on retryable errors.
///
/// The sleep before the n-th retry is `2^(n-1)` seconds clamped to
/// [`BACKOFF_FLOOR_SECS`, `BACKOFF_CEILING_SECS`]: 2s, 2s, 4s, 8s, …
/// When all attempts are exhausted the last error is returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= max_attempts.max(1) {
                    return Err(err);
                }

                let delay_secs = backoff_delay_secs(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs,
                    error = %err,
                    "transient fetch error; retrying after backoff"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
        }
    }
}

fn backoff_delay_secs(retry_index: u32) -> u64 {
    (1u64 << retry_index.min(62)).clamp(BACKOFF_FLOOR_SECS, BACKOFF_CEILING_SECS)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn rate_limited() -> ScrapeError {
        ScrapeError::RateLimited {
            url: "https://example.com/quote/AAPL".to_owned(),
            retry_after_secs: 60,
        }
    }

    #[test]
    fn backoff_schedule_is_clamped() {
        assert_eq!(backoff_delay_secs(0), 2);
        assert_eq!(backoff_delay_secs(1), 2);
        assert_eq!(backoff_delay_secs(2), 4);
        assert_eq!(backoff_delay_secs(3), 8);
        assert_eq!(backoff_delay_secs(5), 30);
        assert_eq!(backoff_delay_secs(62), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScrapeError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_on_rate_limited_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, ScrapeError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_after_exhausting_attempts() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScrapeError>(rate_limited())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ScrapeError::RateLimited { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_request_failed() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScrapeError>(ScrapeError::RequestFailed {
                    status: 503,
                    url: "https://example.com".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(ScrapeError::RequestFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_parse_error() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScrapeError>(ScrapeError::Parse {
                    url: "https://example.com".to_owned(),
                    reason: "not json".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScrapeError::Parse { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_attempts_still_tries_once() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScrapeError>(rate_limited())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}

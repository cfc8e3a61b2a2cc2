//! Retry-with-backoff (C17), grounded on the exponential-backoff loop the
//! teacher's LLM client backend uses for transient network errors: start
//! at a base delay, double on every attempt, cap at a maximum, and only
//! retry errors the caller has flagged as transient.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Additional jitter as a fraction of the computed delay, e.g. `0.1` for
    /// up to 10% jitter.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter_fraction: 0.1,
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis().saturating_mul(1u128 << attempt.min(30));
        let capped = exp.min(self.max_delay.as_millis());
        let jitter_max = (capped as f64 * self.jitter_fraction) as u64;
        let jitter = if jitter_max > 0 {
            rand::thread_rng().gen_range(0..=jitter_max)
        } else {
            0
        };
        Duration::from_millis(capped as u64 + jitter)
    }
}

/// Runs `op` until it succeeds, `is_retryable` says the error shouldn't be
/// retried, or `max_attempts` is exhausted — whichever comes first. Only
/// `RetryableError` errors (per `is_retryable`) trigger a retry; any other
/// error is returned immediately on the first attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= config.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = config.delay_for_attempt(attempt - 1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, &str> = retry_with_backoff(
            &RetryConfig::default(),
            |_| true,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            },
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_max_attempts_then_gives_up() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_fraction: 0.0,
        };
        let result: Result<i32, &str> = retry_with_backoff(&config, |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("boom")
        })
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, &str> = retry_with_backoff(
            &RetryConfig::default(),
            |_| false,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            },
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_fraction: 0.0,
        };
        let result: Result<i32, &str> = retry_with_backoff(&config, |_| true, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("transient")
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

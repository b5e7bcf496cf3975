//! Bounded retry with exponential backoff and jitter for remote calls.

use std::future::Future;

use anyhow::{anyhow, Result};
use rand::Rng;
use tokio::time::{sleep, Duration};

use crate::logging::{log, obj, v_str, v_u64, Domain, Level};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    /// Sync policy from configuration: retry count is the tunable, delays
    /// stay at their defaults.
    pub fn for_sync(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);
        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((clamped + jitter).max(0.0) as u64)
    }
}

/// Runs `operation` up to `max_retries + 1` times, sleeping with backoff and
/// jitter between failures. The last error wins.
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if attempt < config.max_retries {
                    let delay = config.delay_for_attempt(attempt);
                    log(
                        Level::Debug,
                        Domain::Sync,
                        "retry_wait",
                        obj(&[
                            ("op", v_str(operation_name)),
                            ("attempt", v_u64(u64::from(attempt) + 1)),
                            ("of", v_u64(u64::from(config.max_retries) + 1)),
                            ("error", v_str(&err.to_string())),
                            ("delay_ms", v_u64(delay.as_millis() as u64)),
                        ]),
                    );
                    sleep(delay).await;
                }
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("{} exhausted retries without an error", operation_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_clamps() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 200,
            max_delay_ms: 1_000,
            jitter_factor: 0.0,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(1_000));
        assert_eq!(config.delay_for_attempt(9), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_first_try_success_skips_the_loop() {
        let config = RetryConfig::for_sync(3);
        let result: Result<u32> = retry_async(&config, "fetch", || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_eventual_success_after_failures() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            ..Default::default()
        };
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let seen = calls.clone();
        let result: Result<&str> = retry_async(&config, "push", || {
            let calls = seen.clone();
            async move {
                if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                    Err(anyhow!("connection reset"))
                } else {
                    Ok("pushed")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "pushed");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            ..Default::default()
        };
        let result: Result<()> =
            retry_async(&config, "push", || async { Err(anyhow!("503 from upstream")) }).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("503"), "last error surfaces: {}", err);
    }
}

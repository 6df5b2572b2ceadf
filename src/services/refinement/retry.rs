// Bounded retry with exponential backoff for generate/refine calls.
// Each attempt runs under its own call timeout; the delay doubles after
// every failed attempt. Non-retryable errors return at once.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::config_store::RefineConfig;
use crate::services::errors::{HumanizeError, HumanizeResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RefineConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            initial_delay: config.retry_initial_delay(),
            call_timeout: config.call_timeout(),
        }
    }

    /// Delay before attempt `attempt + 1` (attempts are 1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds, fails non-retryably, or the attempt budget
/// is spent. Returns the value and the attempt that produced it.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> HumanizeResult<(T, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HumanizeResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_err = HumanizeError::Provider(format!("{}: no attempt made", label));

    for attempt in 1..=max_attempts {
        let result = match tokio::time::timeout(policy.call_timeout, op()).await {
            Ok(r) => r,
            Err(_) => Err(HumanizeError::Timeout(policy.call_timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    info!("[RETRY] {} succeeded on attempt {}", label, attempt);
                }
                return Ok((value, attempt));
            }
            Err(e) if !e.is_retryable() => {
                warn!("[RETRY] {} failed permanently on attempt {}: {}", label, attempt, e);
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "[RETRY] {} attempt={}/{} failed: {}",
                    label, attempt, max_attempts, e
                );
                last_err = e;
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            call_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_persistent_provider_error_uses_whole_budget() {
        let calls = AtomicU32::new(0);
        let result: HumanizeResult<(String, u32)> = retry_with_backoff(&fast_policy(3), "generate", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HumanizeError::Provider("503".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(HumanizeError::Provider(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: HumanizeResult<(String, u32)> = retry_with_backoff(&fast_policy(3), "generate", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HumanizeError::Validation("no model".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(HumanizeError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let (value, attempt) = retry_with_backoff(&fast_policy(3), "refine", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(HumanizeError::Provider("reset".to_string()))
                } else {
                    Ok("text".to_string())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, "text");
        assert_eq!(attempt, 2);
    }

    #[tokio::test]
    async fn test_slow_call_times_out_and_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            call_timeout: Duration::from_millis(20),
        };
        let result: HumanizeResult<(u32, u32)> = retry_with_backoff(&policy, "generate", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(1)
            }
        })
        .await;
        assert!(matches!(result, Err(HumanizeError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::errors::AiError;
use crate::rate_limiter::RateGate;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; only rate-limit failures are retried
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random delay added to each backoff
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// `base × 2^attempt + jitter`, with the exponent capped to keep the delay bounded
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(6);
        let base = self.base_delay * (1u32 << exponent);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        } else {
            Duration::ZERO
        };
        base + jitter
    }
}

/// Run `attempt` through the gate, retrying rate-limited failures with exponential backoff.
///
/// Each try holds a gate slot only while the attempt runs. Non rate-limit
/// errors are returned immediately; after `max_retries` retries the last
/// error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    gate: &RateGate,
    policy: &RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut retries = 0u32;

    loop {
        let permit = gate.acquire().await;
        let outcome = attempt().await;
        permit.release();

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && retries < policy.max_retries => {
                let delay = policy.backoff_delay(retries);
                retries += 1;
                warn!(
                    operation = operation,
                    retry = retries,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Rate limited, retrying after backoff"
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::RateLimitConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn open_gate() -> RateGate {
        RateGate::new(RateLimitConfig {
            max_concurrent: 1,
            min_interval: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
        })
    }

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_jitter_stays_in_range() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::from_millis(50),
        };
        for _ in 0..20 {
            let delay = policy.backoff_delay(0);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(150));
        }
    }

    #[tokio::test]
    async fn test_permanent_rate_limit_attempted_max_retries_plus_one() {
        let gate = open_gate();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), AiError> = retry_with_backoff(&gate, &quick_policy(3), "test", || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AiError::RateLimited("429".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(AiError::RateLimited(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_invalid_response_fails_fast() {
        let gate = open_gate();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), AiError> = retry_with_backoff(&gate, &quick_policy(3), "test", || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AiError::InvalidResponse("not json".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(AiError::InvalidResponse(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_rate_limits() {
        let gate = open_gate();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&gate, &quick_policy(3), "test", || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(AiError::RateLimited("quota".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(gate.in_flight(), 0);
    }
}

/// Retry logic with exponential backoff for network calls
use cladetime_core::{CladetimeError, CladetimeResult};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier (typically 2.0)
    pub multiplier: f32,
    /// Add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy for network operations
    pub fn for_network(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(120),
            ..Self::default()
        }
    }

    /// Only transport failures are worth another attempt
    fn is_retryable(&self, error: &CladetimeError) -> bool {
        matches!(error, CladetimeError::Network(_))
    }

    /// Calculate backoff duration for attempt number
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff.as_millis() as f32;

        for _ in 0..attempt {
            backoff *= self.multiplier;
        }

        let mut duration =
            Duration::from_millis(backoff.min(self.max_backoff.as_millis() as f32) as u64);

        if self.jitter && duration > Duration::ZERO {
            let mut rng = rand::thread_rng();
            let jitter_ms = rng.gen_range(0..=(duration.as_millis() / 4) as u64);
            duration += Duration::from_millis(jitter_ms);
        }

        duration
    }
}

/// Execute an operation with retry logic
pub fn with_retry<F, T>(mut operation: F, policy: &RetryPolicy, context: &str) -> CladetimeResult<T>
where
    F: FnMut() -> CladetimeResult<T>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !policy.is_retryable(&err) {
                    return Err(err);
                }
                if attempt + 1 >= attempts {
                    error!("All {} attempts failed for {}: {}", attempts, context, err);
                    return Err(err);
                }

                let backoff = policy.calculate_backoff(attempt);
                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {:?}",
                    attempt + 1,
                    attempts,
                    context,
                    err,
                    backoff
                );
                std::thread::sleep(backoff);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_retries_network_errors() {
        let mut calls = 0;
        let result = with_retry(
            || {
                calls += 1;
                if calls < 3 {
                    Err(CladetimeError::Network("connection reset".to_string()))
                } else {
                    Ok(calls)
                }
            },
            &fast_policy(3),
            "test",
        );
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: CladetimeResult<()> = with_retry(
            || {
                calls += 1;
                Err(CladetimeError::Network("timeout".to_string()))
            },
            &fast_policy(2),
            "test",
        );
        assert!(matches!(result, Err(CladetimeError::Network(_))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_does_not_retry_other_errors() {
        let mut calls = 0;
        let result: CladetimeResult<()> = with_retry(
            || {
                calls += 1;
                Err(CladetimeError::InvalidUrl("nope".to_string()))
            },
            &fast_policy(5),
            "test",
        );
        assert!(matches!(result, Err(CladetimeError::InvalidUrl(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::for_network(5)
        };
        assert_eq!(policy.calculate_backoff(0), Duration::from_secs(2));
        assert_eq!(policy.calculate_backoff(1), Duration::from_secs(4));
        assert_eq!(policy.calculate_backoff(10), Duration::from_secs(120));
    }
}

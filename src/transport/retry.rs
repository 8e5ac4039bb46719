use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::GatewayError;

/// Linear backoff: the wait after attempt `n` is `base_delay * n`.
///
/// Every attempt gets a fresh timeout budget from the HTTP client; there is
/// no deadline shared across attempts, so the worst case is roughly
/// `attempts * timeout + sum(delays)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// One attempt, no waiting. Used for the fallback path and diagnostics.
    pub fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number and reports failures as a
    /// human-readable cause. The last cause is carried by the final
    /// `ProviderUnavailable` error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let mut last_cause = String::from("no attempt made");

        for attempt in 1..=self.attempts {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", operation, attempt, self.attempts);
                    }
                    return Ok(value);
                }
                Err(cause) => {
                    warn!(
                        "{} failed on attempt {}/{}: {}",
                        operation, attempt, self.attempts, cause
                    );
                    last_cause = cause;

                    if attempt < self.attempts {
                        let delay = self.delay_for(attempt);
                        debug!("Waiting {:?} before retrying {}", delay, operation);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(GatewayError::ProviderUnavailable(last_cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn test_delay_grows_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_operation_is_attempted_exactly_n_times() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let started: Mutex<Vec<Instant>> = Mutex::new(Vec::new());

        let result: Result<(), _> = policy
            .run("test op", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                started.lock().unwrap().push(Instant::now());
                async move { Err(format!("refused on attempt {}", attempt)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.unwrap_err(),
            GatewayError::ProviderUnavailable("refused on attempt 3".to_string())
        );

        let started = started.lock().unwrap();
        let gaps: Vec<Duration> = started.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 2);
        assert!(gaps[0] >= Duration::from_secs(1));
        assert!(gaps[1] >= gaps[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_first_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("flaky op", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("connection reset".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use feedhound_common::PublishError;

/// Attempt budget plus a fixed delay between attempts.
///
/// Only transient failures are retried. The delay is a tokio sleep, so
/// dropping the future (e.g. on shutdown) abandons the pending retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(4, Duration::from_secs(15))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, fails non-transiently, or the budget is
    /// spent. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, PublishError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PublishError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => {
                    warn!(what, attempt, error = %e, "Non-transient failure, not retrying");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!(what, attempts = attempt, error = %e, "Retries exhausted");
                    return Err(PublishError::Exhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        what,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = self.delay.as_secs(),
                        error = %e,
                        "Transient failure, retrying"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn three_transient_failures_then_success_takes_four_attempts() {
        let calls = AtomicU32::new(0);
        let result = instant(4)
            .run("post", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 4 {
                        Err(PublishError::Transient("503".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_and_last_error() {
        let result: Result<(), _> = instant(3)
            .run("post", |_| async { Err(PublishError::Transient("timeout".into())) })
            .await;

        match result {
            Err(PublishError::Exhausted { attempts, last_error }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("timeout"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = instant(4)
            .run("post", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PublishError::Rejected("duplicate content".into())) }
            })
            .await;

        assert!(matches!(result, Err(PublishError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_fixed_delay_between_attempts() {
        let policy = RetryPolicy::fixed(2, Duration::from_secs(15));
        let start = tokio::time::Instant::now();

        let _: Result<(), _> = policy
            .run("post", |_| async { Err(PublishError::Transient("503".into())) })
            .await;

        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[test]
    fn zero_budget_is_clamped_to_one_attempt() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts, 1);
    }
}

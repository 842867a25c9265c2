//! Bounded exponential-backoff retry for calls into external integrations.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::Result;

/// Wraps a fallible async operation with bounded retries.
///
/// Only transient errors are retried; anything else propagates on the
/// first failure with no delay. On exhaustion the last error surfaces to
/// the caller, which is responsible for circuit-breaker bookkeeping and
/// dead-lettering.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_wait: Duration,
    max_wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_wait: Duration, max_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_wait,
            max_wait,
        }
    }

    /// Run `op`, retrying transient failures with exponential backoff.
    ///
    /// The backoff sleep suspends only this task and holds no lock.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let wait = self.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!(
                            attempts = attempt,
                            error = %err,
                            "All retry attempts exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }

    /// `min(max_wait, min_wait * 2^(attempt - 1))`
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_wait.saturating_mul(factor).min(self.max_wait)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }
}

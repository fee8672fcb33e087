//! Retry policy for the pipeline's external-service stages.
//!
//! An explicit policy object owned by the orchestrator — clients make
//! single attempts and stay out of retry decisions.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 3 attempts, backing off 1s then 2s.
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Runs `op` until it succeeds or attempts are exhausted, preserving the
    /// last error. Exponential backoff between attempts.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.max_attempts.max(1) {
                        return Err(e);
                    }
                    let delay = self.base_delay * (1u32 << (attempt - 1));
                    warn!(
                        "attempt {attempt} failed ({e}), retrying after {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

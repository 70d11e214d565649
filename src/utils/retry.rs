//! Bounded retry with per-attempt timeout for remote provider calls.
//!
//! Backoff doubles after every failed attempt up to `max_backoff`.
//! Only errors for which [`AppError::is_transient`] holds are retried;
//! a timed-out attempt counts as transient.

use crate::types::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Deadline applied to each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
            attempt_timeout,
        }
    }

    /// Same attempts and backoff, but no deadline on individual attempts.
    ///
    /// For operations that enforce their own bound, such as waiting for a
    /// new index to become ready.
    pub fn without_attempt_timeout(&self) -> Self {
        Self {
            attempt_timeout: Duration::MAX,
            ..self.clone()
        }
    }

    async fn attempt<Fut, T>(&self, name: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        if self.attempt_timeout == Duration::MAX {
            return fut.await;
        }
        match timeout(self.attempt_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Unavailable(format!(
                "{} timed out after {:?}",
                name, self.attempt_timeout
            ))),
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<F, Fut, T>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = self.attempt(name, operation()).await;

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        operation = name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

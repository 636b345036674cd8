//! Bounded sequential retry with backoff.
//!
//! Calls an async operation up to `max_attempts` times. Between attempts the
//! executor sleeps according to the [`Backoff`] policy; the sleep races the
//! caller's [`Cancellation`] and aborts with [`RetryError::Cancelled`] if the
//! signal fires first. There is no wait after the final attempt.
//!
//! Exponential delays are `base * 2^(k-1)` before attempt `k + 1`, scaled by
//! a uniform jitter factor in `[0.8, 1.2]`: 1s, 2s, 4s, ... for a 1s base.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::cancel::Cancellation;

/// Lower bound of the jitter factor.
const JITTER_MIN: f64 = 0.8;
/// Upper bound of the jitter factor.
const JITTER_MAX: f64 = 1.2;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Doubling delay with ±20 % jitter.
    Exponential,
    /// Constant delay, no jitter. Used for polling.
    Fixed,
}

/// Retry budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Exponential policy with jitter.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff: Backoff::Exponential,
        }
    }

    /// Fixed-interval policy.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: interval,
            backoff: Backoff::Fixed,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based).
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Delay actually slept after failed attempt `attempt`. Kept synchronous
    /// so the thread-local RNG is never held across an await.
    fn delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        match self.backoff {
            Backoff::Fixed => nominal,
            Backoff::Exponential => {
                let factor = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
                Duration::try_from_secs_f64(nominal.as_secs_f64() * factor).unwrap_or(nominal)
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Five attempts, one second base, exponential.
    fn default() -> Self {
        Self::exponential(5, Duration::from_secs(1))
    }
}

/// Why a retried operation did not produce a value.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The cancellation signal fired while waiting between attempts.
    #[error("operation cancelled")]
    Cancelled,

    /// Every attempt failed; carries the last error.
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with an error the caller marked non-retryable.
    #[error("non-retryable failure on attempt {attempt}: {error}")]
    Fatal { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    /// The underlying operation error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Cancelled => None,
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Fatal { error, .. } => Some(error),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }
}

/// Retry `op` on every error until the budget is spent.
///
/// `op` receives the 1-based attempt number.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    cancel: &Cancellation,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    run_with_retry_if(policy, cancel, op, |_| true).await
}

/// Retry `op` while `retryable` approves the error. A rejected error is
/// returned at once as [`RetryError::Fatal`].
pub async fn run_with_retry_if<T, E, F, Fut, P>(
    policy: RetryPolicy,
    cancel: &Cancellation,
    mut op: F,
    retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        let error = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !retryable(&error) {
            return Err(RetryError::Fatal { attempt, error });
        }
        if attempt >= attempts {
            return Err(RetryError::Exhausted {
                attempts,
                last: error,
            });
        }

        let delay = policy.delay(attempt);
        tracing::warn!(
            attempt,
            max_attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, retrying: {error}"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

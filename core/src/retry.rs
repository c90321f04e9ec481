//! Retry with exponential backoff.
//!
//! `RetryPolicy` decides whether and how long to wait after a failed attempt;
//! `RetryExecutor` runs an operation under a policy. The wall-clock wait goes
//! through a `Sleeper` so tests can record delays instead of sleeping.

use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Exponential backoff policy.
///
/// A call makes at most `max_retries + 1` attempts. The wait before retry
/// `k` (1-based) is `base_delay * 2^(k-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, err: &ApiError) -> RetryDecision {
        if !err.is_transient() || attempt > self.max_retries {
            return RetryDecision::NoRetry;
        }
        match err.retry_after() {
            Some(hint) if !hint.is_zero() => RetryDecision::RetryAfter(hint),
            _ => RetryDecision::RetryAfter(self.delay_for(attempt)),
        }
    }
}

/// Source of wall-clock delay between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Runs operations under a `RetryPolicy`.
#[derive(Debug, Clone)]
pub struct RetryExecutor<S = ThreadSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryExecutor<ThreadSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<S: Sleeper> RetryExecutor<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    ///
    /// Permanent failures are returned unchanged. When the last allowed
    /// attempt fails transiently the result is `ApiError::RetryExhausted`
    /// wrapping that failure.
    pub fn execute<T, F>(&self, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Result<T, ApiError>,
    {
        let max_retries = self.policy.max_retries;
        let mut attempt = 1u32;
        loop {
            let err = match operation() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_transient() {
                return Err(err);
            }
            match self.policy.decide(attempt, &err) {
                RetryDecision::NoRetry => {
                    return Err(ApiError::RetryExhausted {
                        attempts: attempt,
                        max_retries,
                        source: Box::new(err),
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    self.sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

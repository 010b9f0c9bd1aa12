//! Retry utilities with exponential backoff.
//!
//! Wraps any fallible async operation. The caller decides which errors are
//! worth retrying; everything else is returned immediately.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::{saturating_duration, seconds_to_duration};
use crate::errors::ConfigError;

/// Exponential backoff policy.
///
/// `max_attempts` counts every call of the operation, including the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the initial one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: f64,
    /// Multiplier applied to the delay after each retry.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Upper bound on a single delay, in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> f64 {
    1.0
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    60.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_seconds: default_initial_delay(),
            backoff_factor: default_backoff_factor(),
            max_delay_seconds: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempts, initial delay and factor.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_seconds: initial_delay.as_secs_f64(),
            backoff_factor,
            ..Self::default()
        }
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_seconds = delay.as_secs_f64();
        self
    }

    /// Sets the backoff factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_seconds = delay.as_secs_f64();
        self
    }

    /// Initial delay as a `Duration`.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        saturating_duration(self.initial_delay_seconds)
    }

    /// Delay to wait before retry number `retry` (0-indexed).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay = self.initial_delay_seconds * self.backoff_factor.powi(exponent);
        let capped = delay.min(self.max_delay_seconds);
        saturating_duration(capped)
    }

    /// The full delay schedule this policy can produce.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.delay_for_retry(retry))
            .collect()
    }

    /// Checks that the policy values are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::invalid_value("max_attempts", "must be at least 1"));
        }
        if !(self.initial_delay_seconds > 0.0) || !self.initial_delay_seconds.is_finite() {
            return Err(ConfigError::invalid_value(
                "initial_delay_seconds",
                "must be a positive number",
            ));
        }
        if !(self.backoff_factor >= 1.0) || !self.backoff_factor.is_finite() {
            return Err(ConfigError::invalid_value("backoff_factor", "must be at least 1.0"));
        }
        seconds_to_duration("initial_delay_seconds", self.initial_delay_seconds)?;
        seconds_to_duration("max_delay_seconds", self.max_delay_seconds)?;
        if !(self.max_delay_seconds >= self.initial_delay_seconds) {
            return Err(ConfigError::invalid_value(
                "max_delay_seconds",
                "must not be smaller than initial_delay_seconds",
            ));
        }
        Ok(())
    }
}

/// State tracking for one retried operation.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Number of failed attempts so far.
    pub attempt: u32,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no attempts remain.
    #[must_use]
    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempt >= policy.max_attempts
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more attempts, give up.
    GiveUp,
    /// The error is not retryable.
    NotRetryable,
}

/// Records a failed attempt and decides what to do next.
#[must_use]
pub fn should_retry(state: &mut RetryState, policy: &RetryPolicy, retryable: bool) -> RetryDecision {
    state.attempt += 1;

    if !retryable {
        return RetryDecision::NotRetryable;
    }
    if state.is_exhausted(policy) {
        return RetryDecision::GiveUp;
    }

    RetryDecision::Retry(policy.delay_for_retry(state.attempt - 1))
}

/// Executes an operation, retrying every error.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(policy, label, operation, |_| true).await
}

/// Executes an operation, retrying errors for which `is_retryable` holds.
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut state = RetryState::new();

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => match should_retry(&mut state, policy, is_retryable(&e)) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        operation = label,
                        attempt = state.attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        operation = label,
                        attempts = state.attempt,
                        error = %e,
                        "All attempts failed"
                    );
                    return Err(e);
                }
                RetryDecision::NotRetryable => {
                    tracing::debug!(operation = label, error = %e, "Error is not retryable");
                    return Err(e);
                }
            },
        }
    }
}

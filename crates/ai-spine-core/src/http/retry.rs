//! Retry logic with exponential backoff for HTTP requests
//!
//! Transient outcomes (connect failures, transport timeouts, 429 and
//! 500/502/503/504) are retried; a 429's Retry-After replaces the computed
//! backoff for that attempt.

use std::time::Duration;
use backoff::{ExponentialBackoff, backoff::Backoff};
use crate::http::error::HttpError;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts a request may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Create an exponential backoff instance
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.base_delay,
            current_interval: self.base_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            max_elapsed_time: None, // We handle max attempts separately
            ..Default::default()
        };

        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }

        backoff
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
}

/// Per-request retry state
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    retries: u32,
    backoff: ExponentialBackoff,
}

impl RetryHandler {
    /// Create a new retry handler with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        let backoff = policy.create_backoff();
        Self {
            policy,
            retries: 0,
            backoff,
        }
    }

    /// Determine if a request should be retried based on its outcome
    pub fn should_retry(&mut self, error: &HttpError) -> RetryDecision {
        if self.retries >= self.policy.max_retries {
            return RetryDecision::NoRetry;
        }

        if !error.should_retry() {
            return RetryDecision::NoRetry;
        }

        self.retries += 1;

        // Advance the backoff even when Retry-After wins so the next
        // computed delay keeps growing
        let computed = self.backoff.next_backoff().unwrap_or(self.policy.max_delay);
        let delay = error
            .get_retry_delay()
            .map(Duration::from_secs)
            .unwrap_or(computed);

        RetryDecision::Retry { delay }
    }

    /// Number of retries granted so far
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Execute a request with retry logic.
///
/// `request_fn` is invoked once per attempt. Sleeps use `tokio::time`, so
/// they run on the monotonic clock and are aborted if the returned future is
/// dropped.
pub async fn execute_with_retry<F, Fut, T>(
    mut request_fn: F,
    policy: RetryPolicy,
) -> Result<T, HttpError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, HttpError>>,
{
    let mut handler = RetryHandler::new(policy);
    let mut attempt = 1;

    loop {
        match request_fn(attempt).await {
            Ok(response) => return Ok(response),
            Err(error) => match handler.should_retry(&error) {
                RetryDecision::Retry { delay } => {
                    tracing::warn!(
                        attempt,
                        status = ?error.status_code,
                        classification = ?error.classification,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::NoRetry => {
                    if error.should_retry() {
                        tracing::error!(
                            attempts = attempt,
                            status = ?error.status_code,
                            "Retries exhausted"
                        );
                    }
                    return Err(error);
                }
            },
        }
    }
}

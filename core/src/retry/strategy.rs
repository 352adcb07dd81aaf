//! Backoff strategy and per-attempt decision
//!
//! One attempt moves the retry state machine from `Attempting` to one of
//! three outcomes:
//! - `Complete(response)`: hand the response to the caller (2xx, 4xx, or a
//!   429/5xx seen on the final attempt)
//! - `Retry(wait)`: sleep for `wait`, then attempt again
//! - `Fatal(cause)`: the connection failed on the final attempt

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use serde::Deserialize;
use std::time::Duration;

use super::classifier::{ResponseClass, classify_status};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base of the exponential delay, in seconds
    #[serde(default = "default_base_wait_secs")]
    pub base_wait_secs: f64,
}

/// Each delay doubles the previous one
const BACKOFF_FACTOR: f32 = 2.0;

fn default_max_attempts() -> u32 {
    6
}

fn default_base_wait_secs() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_wait_secs: default_base_wait_secs(),
        }
    }
}

/// What one attempt observed
#[derive(Debug)]
pub enum Observation<R, E> {
    /// The remote answered
    Response {
        status: u16,
        retry_after: Option<Duration>,
        response: R,
    },
    /// Timeout, reset, refused, or a body that could not be read
    ConnectionFault(E),
}

/// Outcome of one attempt after applying the retry policy
#[derive(Debug, PartialEq, Eq)]
pub enum AttemptOutcome<R, E> {
    Complete(R),
    Retry(Duration),
    Fatal(E),
}

impl RetryConfig {
    fn base_wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_wait_secs).unwrap_or_default()
    }

    /// Uncapped exponential schedule starting at the base delay, no jitter.
    fn schedule(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_wait())
            .with_factor(BACKOFF_FACTOR)
            .without_max_delay()
    }

    /// Delay before the attempt following `attempt` (1-indexed):
    /// `base * 2^(attempt-1)`, saturating at `Duration::MAX`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let steps = usize::try_from(attempt.max(1)).unwrap_or(usize::MAX);
        let mut delay = Duration::ZERO;
        for next in self.schedule().with_max_times(steps).build() {
            delay = next;
            if delay > Duration::MAX / 2 {
                return Duration::MAX;
            }
        }
        delay
    }

    /// Decide what to do after attempt number `attempt` (1-indexed).
    pub fn evaluate<R, E>(&self, attempt: u32, observation: Observation<R, E>) -> AttemptOutcome<R, E> {
        let exhausted = attempt >= self.max_attempts;
        match observation {
            Observation::Response {
                status,
                retry_after,
                response,
            } => {
                let class = classify_status(status);
                if exhausted || !class.is_retryable() {
                    return AttemptOutcome::Complete(response);
                }
                let hint = match class {
                    ResponseClass::RateLimited => retry_after,
                    _ => None,
                };
                AttemptOutcome::Retry(hint.unwrap_or_else(|| self.backoff(attempt)))
            }
            Observation::ConnectionFault(cause) => {
                if exhausted {
                    AttemptOutcome::Fatal(cause)
                } else {
                    AttemptOutcome::Retry(self.backoff(attempt))
                }
            }
        }
    }
}

/// Blocking delay between attempts. Injected so tests can record waits
/// instead of sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

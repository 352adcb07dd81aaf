//! Retry logic with exponential backoff
//!
//! This module provides:
//! - Response classification (success, rate limited, server fault, rejected)
//! - Exponential backoff `base * 2^(attempt-1)` with no upper cap
//! - `Retry-After` support for rate-limit responses
//! - An injectable `Sleeper` so backoff can be tested without real delays
//!
//! The decision for one attempt is a pure function
//! ([`RetryConfig::evaluate`]); the loop that sleeps and re-sends lives in
//! [`crate::transport`].

pub mod classifier;
pub mod strategy;

pub use classifier::{ResponseClass, classify_status, parse_retry_after};
pub use strategy::{AttemptOutcome, Observation, RetryConfig, Sleeper, TokioSleeper};

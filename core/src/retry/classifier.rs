//! Response classification for retry decisions

use std::time::Duration;

/// How a single HTTP status should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx, never retried
    Success,
    /// 429, retried after the server hint or the backoff delay
    RateLimited,
    /// 5xx, retried with backoff; the last response is handed back once
    /// attempts run out
    ServerFault,
    /// Anything else (4xx, 3xx). Final on the first attempt; the caller
    /// decides whether it matters.
    Rejected,
}

impl ResponseClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerFault)
    }
}

pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        429 => ResponseClass::RateLimited,
        500..=599 => ResponseClass::ServerFault,
        _ => ResponseClass::Rejected,
    }
}

/// Parse a `Retry-After` header value given in (possibly fractional) seconds.
///
/// HTTP-date values, negatives and non-finite numbers yield `None`, which
/// makes the caller fall back to the exponential delay.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

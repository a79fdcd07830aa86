//! Retry and backoff policy for GitHub API calls.
//!
//! GitHub signals throttling in two ways: a 429, or a 403 together with
//! `X-RateLimit-Remaining: 0`. Server errors (500, 502, 503, 504) are treated as
//! transient. Everything else is final for the request.

use std::time::Duration;

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

/// How a single HTTP response should be handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 404
    NotFound,
    /// 401
    Unauthorized,
    /// 429, or 403 with an exhausted rate limit
    RateLimited,
    /// 500, 502, 503, 504
    Transient,
    /// Any other failure status
    Permanent,
}

/// Classifies an HTTP status.
///
/// `rate_limit_remaining` is the parsed `X-RateLimit-Remaining` header. A 403
/// whose body mentions the rate limit is also treated as throttling, which is
/// how secondary rate limits are reported.
pub fn classify_status(status: u16, rate_limit_remaining: Option<u64>, body: &str) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Unauthorized,
        404 => StatusClass::NotFound,
        429 => StatusClass::RateLimited,
        403 if rate_limit_remaining == Some(0)
            || body.to_ascii_lowercase().contains("rate limit") =>
        {
            StatusClass::RateLimited
        }
        500 | 502 | 503 | 504 => StatusClass::Transient,
        _ => StatusClass::Permanent,
    }
}

/// Bounded exponential backoff with rate-limit awareness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt. Doubles for each attempt after that.
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay.
    pub max_delay: Duration,
    /// Upper bound for a single wait on a rate-limit reset.
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_rate_limit_wait: Duration::from_secs(900),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_rate_limit_wait: Duration::ZERO,
        }
    }

    /// Returns the delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }

    /// Returns how long to wait for a rate limit that resets at `reset_epoch`.
    ///
    /// Two seconds of slack are added for clock skew. Without a reset time the
    /// regular backoff for `attempt` applies.
    pub fn rate_limit_delay(&self, reset_epoch: Option<u64>, now_epoch: u64, attempt: u32) -> Duration {
        match reset_epoch {
            Some(reset) => {
                let secs = reset.saturating_sub(now_epoch).saturating_add(2).max(1);
                Duration::from_secs(secs).min(self.max_rate_limit_wait)
            }
            None => self.backoff_delay(attempt),
        }
    }

    /// Returns true when another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

//! Rate-limit retry policy
//!
//! Only HTTP 429 is retried. The wait comes from the API's reset hint when it
//! sends one, otherwise from the configured backoff, and the number of retries
//! is bounded so a persistently throttled request eventually fails.

use crate::api::constants::headers;
use log::debug;
use rand::Rng;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: u32,
    /// Backoff used when the response carries no reset hint
    pub base_delay: Duration,
    /// Upper bound for any single wait, hinted or not
    pub max_delay: Duration,
    /// 1.0 keeps the backoff fixed
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential backoff with jitter, for long-running bulk jobs
    pub fn exponential() -> Self {
        Self {
            max_retries: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Classification of request failures
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    /// Network-level errors (connection refused, DNS, reset)
    Network,
    /// No response within the request timeout
    Timeout,
    /// HTTP 429 Too Many Requests
    RateLimited,
    /// Other 4xx responses
    ClientError(u16),
    /// 5xx responses
    ServerError(u16),
    Unknown,
}

impl RetryableError {
    /// Only throttling is retried; everything else is surfaced to the caller
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryableError::RateLimited)
    }

    /// Classify an HTTP status code
    pub fn from_status_code(status: u16) -> Self {
        match status {
            429 => RetryableError::RateLimited,
            400..=499 => RetryableError::ClientError(status),
            500..=599 => RetryableError::ServerError(status),
            _ => RetryableError::Unknown,
        }
    }

    /// Classify a reqwest error
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            RetryableError::Timeout
        } else if error.is_connect() || error.is_request() {
            RetryableError::Network
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16())
        } else {
            RetryableError::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RetryableError::Network => "network error",
            RetryableError::Timeout => "timed out",
            RetryableError::RateLimited => "rate limited",
            RetryableError::ClientError(_) => "client error",
            RetryableError::ServerError(_) => "server error",
            RetryableError::Unknown => "request error",
        }
    }
}

/// Decides whether and how long to wait before re-sending a throttled request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether a response with `status` should be retried after `retries_done` retries
    pub fn should_retry(&self, status: u16, retries_done: u32) -> bool {
        RetryableError::from_status_code(status).should_retry()
            && retries_done < self.config.max_retries
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32, response_headers: &HeaderMap) -> Duration {
        let delay = match reset_hint(response_headers) {
            Some(hint) => {
                debug!("Using rate-limit reset hint of {:?}", hint);
                hint
            }
            None => self.calculate_delay(retry),
        };
        delay.min(self.config.max_delay)
    }

    /// Backoff delay with optional jitter
    fn calculate_delay(&self, retry: u32) -> Duration {
        let delay_ms = (self.config.base_delay.as_millis() as f64)
            * self.config.backoff_multiplier.powi(retry.saturating_sub(1) as i32);

        let mut delay = Duration::from_millis(delay_ms as u64);

        if delay > self.config.max_delay {
            delay = self.config.max_delay;
        }

        if self.config.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.5);
            let jittered_ms = (delay.as_millis() as f64 * jitter_factor) as u64;
            delay = Duration::from_millis(jittered_ms);
        }

        delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Read the server's hint for when the rate-limit window resets
pub fn reset_hint(response_headers: &HeaderMap) -> Option<Duration> {
    if let Some(seconds) = header_str(response_headers, headers::RATELIMIT_RESET)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
    {
        // Past Duration::MAX; the caller caps at max_delay anyway
        return Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX));
    }

    let retry_after = header_str(response_headers, headers::RETRY_AFTER)?;
    if let Ok(seconds) = retry_after.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // HTTP-date form
    let at = chrono::DateTime::parse_from_rfc2822(retry_after.trim()).ok()?;
    let wait = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

fn header_str<'a>(response_headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    response_headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn fixed(max_retries: u32, base_ms: u64) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 1.0,
            jitter: false,
        })
    }

    #[test]
    fn test_only_rate_limiting_is_retryable() {
        assert!(RetryableError::RateLimited.should_retry());
        assert!(!RetryableError::Network.should_retry());
        assert!(!RetryableError::Timeout.should_retry());
        assert!(!RetryableError::ServerError(503).should_retry());
        assert!(!RetryableError::ClientError(404).should_retry());
    }

    #[test]
    fn test_status_code_classification() {
        assert_eq!(RetryableError::from_status_code(429), RetryableError::RateLimited);
        assert_eq!(RetryableError::from_status_code(400), RetryableError::ClientError(400));
        assert_eq!(RetryableError::from_status_code(500), RetryableError::ServerError(500));
        assert_eq!(RetryableError::from_status_code(302), RetryableError::Unknown);
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        let policy = fixed(2, 10);
        assert!(policy.should_retry(429, 0));
        assert!(policy.should_retry(429, 1));
        assert!(!policy.should_retry(429, 2));
        assert!(!policy.should_retry(500, 0));
    }

    #[test]
    fn test_fixed_backoff_without_hint() {
        let policy = fixed(3, 250);
        let no_headers = HeaderMap::new();
        assert_eq!(policy.delay_for(1, &no_headers), Duration::from_millis(250));
        assert_eq!(policy.delay_for(3, &no_headers), Duration::from_millis(250));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: false,
        });
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(5), Duration::from_secs(5));
    }

    #[test]
    fn test_reset_hint_takes_precedence() {
        let policy = fixed(3, 250);
        let mut response_headers = HeaderMap::new();
        response_headers.insert(headers::RATELIMIT_RESET, HeaderValue::from_static("2"));
        response_headers.insert(headers::RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(policy.delay_for(1, &response_headers), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_after_fallback_and_cap() {
        let policy = fixed(3, 250);
        let mut response_headers = HeaderMap::new();
        response_headers.insert(headers::RETRY_AFTER, HeaderValue::from_static("3600"));
        assert_eq!(policy.delay_for(1, &response_headers), Duration::from_secs(10));
    }

    #[test]
    fn test_unparsable_hint_ignored() {
        let mut response_headers = HeaderMap::new();
        response_headers.insert(headers::RATELIMIT_RESET, HeaderValue::from_static("soon"));
        assert_eq!(reset_hint(&response_headers), None);
    }

    #[test]
    fn test_huge_hint_is_capped() {
        let mut response_headers = HeaderMap::new();
        response_headers.insert(headers::RATELIMIT_RESET, HeaderValue::from_static("1e20"));
        assert_eq!(reset_hint(&response_headers), Some(Duration::MAX));
        assert_eq!(fixed(3, 250).delay_for(1, &response_headers), Duration::from_secs(10));
    }
}

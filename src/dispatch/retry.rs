//! Retry policy (spec §4's retry loop): which attempts are eligible and how
//! long to sleep between them.

use std::time::Duration;

use http::{HeaderMap, Method};

use crate::config::RetryConfig;

#[must_use]
pub fn method_is_retryable(config: &RetryConfig, method: &Method) -> bool {
    config.retry_methods.contains(method)
}

#[must_use]
pub fn status_is_retryable(config: &RetryConfig, status: u16) -> bool {
    config.retry_statuses.contains(&status)
}

/// `retry-after` can be an integer seconds count or an HTTP-date; falls back
/// to exponential backoff when absent or unparseable.
#[must_use]
pub fn compute_delay(config: &RetryConfig, attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(value) = retry_after {
        if let Ok(secs) = value.trim().parse::<u64>() {
            if secs > 0 {
                return Duration::from_millis(secs * 1000).min(config.max_delay);
            }
        } else if let Ok(when) = httpdate::parse_http_date(value.trim()) {
            if let Ok(remaining) = when.duration_since(std::time::SystemTime::now()) {
                return remaining.min(config.max_delay);
            }
        }
    }
    let backoff = config.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    backoff.min(config.max_delay)
}

#[must_use]
pub fn retry_after_header(headers: &HeaderMap) -> Option<String> {
    headers.get("retry-after").and_then(|v| v.to_str().ok()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_retry_after_is_capped_at_max_delay() {
        let config = RetryConfig::default();
        let delay = compute_delay(&config, 0, Some("2"));
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn zero_or_unparseable_retry_after_falls_back_to_backoff() {
        let config = RetryConfig::default();
        let delay = compute_delay(&config, 0, Some("not-a-number"));
        assert_eq!(delay, config.base_delay);
        let delay_zero = compute_delay(&config, 1, Some("0"));
        assert_eq!(delay_zero, config.base_delay * 2);
    }

    #[test]
    fn exponential_backoff_doubles_per_attempt() {
        let config = RetryConfig::default();
        assert_eq!(compute_delay(&config, 0, None), config.base_delay);
        assert_eq!(compute_delay(&config, 1, None), config.base_delay * 2);
        assert_eq!(compute_delay(&config, 2, None), config.base_delay * 4);
    }

    #[test]
    fn backoff_never_exceeds_max_delay() {
        let config = RetryConfig::default();
        let delay = compute_delay(&config, 20, None);
        assert_eq!(delay, config.max_delay);
    }
}

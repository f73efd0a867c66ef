use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use crate::retry::config::RetryConfig;
use crate::retry::headers::parse_retry_after;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    NotRetryable,
    AttemptsExhausted,
    NetworkFailure,
    HttpStatus(u16),
    RetryAfterHeader,
}

/// Decides whether attempt `attempt_no` (1-based) should be followed by
/// another one, and after what delay.
///
/// Only transport failures and the configured "retry later" statuses are
/// retried. A server-provided delay wins over backoff; backoff is
/// `base * factor^(attempt_no - 1)` capped at `max_delay`, with full jitter
/// drawn from `rand_u64`.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: usize,
    http_status: Option<u16>,
    response_headers: Option<&BTreeMap<String, String>>,
    network_failed: bool,
    now: SystemTime,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    match http_status {
        Some(status) if !cfg.retry_statuses.contains(&status) => {
            return RetryDecision::Stop {
                reason: RetryReason::HttpStatus(status),
            };
        }
        None if !network_failed => {
            return RetryDecision::Stop {
                reason: RetryReason::NotRetryable,
            };
        }
        _ => {}
    }

    if attempt_no >= cfg.max_attempts {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    if let Some(delay) = response_headers.and_then(|h| parse_retry_after(h, &cfg.vendor_headers, now)) {
        return RetryDecision::RetryAfter {
            delay: delay.min(cfg.max_delay),
            reason: RetryReason::RetryAfterHeader,
        };
    }

    let exp = attempt_no.saturating_sub(1).min(32) as i32;
    let raw = (cfg.base_delay.as_millis() as f64) * cfg.factor.powi(exp);
    let raw_ms = raw.min(cfg.max_delay.as_millis() as f64).max(0.0) as u64;
    let jitter_ms = if raw_ms == 0 { 0 } else { rand_u64() % (raw_ms + 1) };

    RetryDecision::RetryAfter {
        delay: Duration::from_millis(jitter_ms),
        reason: http_status
            .map(RetryReason::HttpStatus)
            .unwrap_or(RetryReason::NetworkFailure),
    }
}

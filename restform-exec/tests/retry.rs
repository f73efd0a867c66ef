use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use restform_exec::retry::{
    decide_retry, parse_retry_after, RetryConfig, RetryDecision, RetryReason, RetryVendorHeader,
    VendorHeaderKind,
};

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn parse_retry_after_delta_seconds() {
    let h = headers(&[("Retry-After", "5")]);
    assert_eq!(
        parse_retry_after(&h, &[], SystemTime::now()),
        Some(Duration::from_secs(5))
    );
}

#[test]
fn parse_retry_after_http_date() {
    let now = SystemTime::now();
    let h = headers(&[("retry-after", &httpdate::fmt_http_date(now + Duration::from_secs(10)))]);
    let delay = parse_retry_after(&h, &[], now).unwrap();
    assert!(delay.as_secs() >= 9 && delay.as_secs() <= 10);
}

#[test]
fn past_dates_mean_retry_now() {
    let now = SystemTime::now();
    let h = headers(&[("Retry-After", &httpdate::fmt_http_date(now - Duration::from_secs(60)))]);
    assert_eq!(parse_retry_after(&h, &[], now), Some(Duration::ZERO));
}

#[test]
fn vendor_headers_are_read_after_the_standard_one() {
    let vendor = vec![
        RetryVendorHeader {
            name: "X-RateLimit-Reset".to_string(),
            kind: VendorHeaderKind::UnixSeconds,
        },
        RetryVendorHeader {
            name: "X-Retry-In".to_string(),
            kind: VendorHeaderKind::DeltaSeconds,
        },
    ];
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);

    let h = headers(&[("X-RateLimit-Reset", "1015")]);
    assert_eq!(parse_retry_after(&h, &vendor, now), Some(Duration::from_secs(15)));

    let h = headers(&[("x-retry-in", "7")]);
    assert_eq!(parse_retry_after(&h, &vendor, now), Some(Duration::from_secs(7)));

    let h = headers(&[("Retry-After", "2"), ("X-Retry-In", "9")]);
    assert_eq!(parse_retry_after(&h, &vendor, now), Some(Duration::from_secs(2)));

    assert_eq!(parse_retry_after(&BTreeMap::new(), &vendor, now), None);
}

#[test]
fn retry_after_header_wins_over_backoff() {
    let cfg = RetryConfig::default();
    let h = headers(&[("Retry-After", "5")]);
    let d = decide_retry(&cfg, 1, Some(429), Some(&h), false, SystemTime::UNIX_EPOCH, || 123);
    assert_eq!(
        d,
        RetryDecision::RetryAfter {
            delay: Duration::from_secs(5),
            reason: RetryReason::RetryAfterHeader
        }
    );
}

#[test]
fn server_delay_is_capped() {
    let cfg = RetryConfig::default();
    let h = headers(&[("Retry-After", "3600")]);
    match decide_retry(&cfg, 1, Some(503), Some(&h), false, SystemTime::UNIX_EPOCH, || 0) {
        RetryDecision::RetryAfter { delay, .. } => assert_eq!(delay, cfg.max_delay),
        other => panic!("unexpected decision: {other:?}"),
    }
}

#[test]
fn backoff_uses_full_jitter() {
    let cfg = RetryConfig::default();
    // attempt 3: 500ms * 2^2 = 2000ms ceiling
    let d = decide_retry(&cfg, 3, Some(503), None, false, SystemTime::UNIX_EPOCH, || 2_000);
    assert_eq!(
        d,
        RetryDecision::RetryAfter {
            delay: Duration::from_millis(2_000),
            reason: RetryReason::HttpStatus(503)
        }
    );
    let d = decide_retry(&cfg, 3, None, None, true, SystemTime::UNIX_EPOCH, || 2_001);
    assert_eq!(
        d,
        RetryDecision::RetryAfter {
            delay: Duration::ZERO,
            reason: RetryReason::NetworkFailure
        }
    );
}

#[test]
fn other_statuses_and_exhausted_attempts_stop() {
    let cfg = RetryConfig::default();
    assert_eq!(
        decide_retry(&cfg, 1, Some(500), None, false, SystemTime::UNIX_EPOCH, || 0),
        RetryDecision::Stop {
            reason: RetryReason::HttpStatus(500)
        }
    );
    assert_eq!(
        decide_retry(&cfg, cfg.max_attempts, Some(429), None, false, SystemTime::UNIX_EPOCH, || 0),
        RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted
        }
    );
    assert_eq!(
        decide_retry(&cfg, 1, None, None, false, SystemTime::UNIX_EPOCH, || 0),
        RetryDecision::Stop {
            reason: RetryReason::NotRetryable
        }
    );
}

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use httpdate::parse_http_date;

use crate::retry::config::{RetryVendorHeader, VendorHeaderKind};

/// Server-requested delay from `Retry-After` or one of `vendor` headers.
pub fn parse_retry_after(
    headers: &BTreeMap<String, String>,
    vendor: &[RetryVendorHeader],
    now: SystemTime,
) -> Option<Duration> {
    let standard = header(headers, "retry-after").and_then(|v| {
        let v = v.trim();
        match v.parse::<u64>() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => until(parse_http_date(v).ok()?, now),
        }
    });
    if standard.is_some() {
        return standard;
    }

    vendor.iter().find_map(|vh| {
        let v = header(headers, &vh.name)?.trim();
        match vh.kind {
            VendorHeaderKind::DeltaSeconds => v.parse::<u64>().ok().map(Duration::from_secs),
            VendorHeaderKind::UnixSeconds => {
                let at = SystemTime::UNIX_EPOCH + Duration::from_secs(v.parse::<u64>().ok()?);
                until(at, now)
            }
            VendorHeaderKind::HttpDate => until(parse_http_date(v).ok()?, now),
        }
    })
}

/// Dates in the past mean "now".
fn until(at: SystemTime, now: SystemTime) -> Option<Duration> {
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}

pub(crate) fn header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

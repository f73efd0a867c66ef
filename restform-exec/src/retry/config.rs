use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Statuses the server uses to say "retry later".
    pub retry_statuses: BTreeSet<u16>,
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Checked in order after `Retry-After`.
    pub vendor_headers: Vec<RetryVendorHeader>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_statuses: [429u16, 503].into_iter().collect(),
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: 4,
            vendor_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryVendorHeader {
    pub name: String,
    pub kind: VendorHeaderKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorHeaderKind {
    /// delta seconds
    #[default]
    DeltaSeconds,
    /// unix epoch seconds
    UnixSeconds,
    HttpDate,
}

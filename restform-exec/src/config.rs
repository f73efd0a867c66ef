//! Provider configuration (YAML or JSON).
//!
//! ```yaml
//! base_url: https://api.example.com
//! region: eu-west
//! headers:
//!   X-Client: restform
//! credentials:
//!   api_key: secrets://EXAMPLE_API_KEY
//!   basic: file-secrets://basic-auth
//! resources:
//!   cluster_v1:
//!     api_version: v2
//!     region: us-east
//! retry:
//!   max_attempts: 4
//! poll:
//!   interval_ms: 2000
//!   timeout_secs: 600
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::retry::{RetryConfig, RetryVendorHeader, VendorHeaderKind};
use crate::secrets::SecretRef;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Default base URL; takes precedence over the document's `servers`.
    pub base_url: Option<String>,
    /// Default region for resources bound to a regional host template.
    pub region: Option<String>,
    /// Static headers added to every request.
    pub headers: BTreeMap<String, String>,
    /// Security scheme name → credential.
    pub credentials: BTreeMap<String, Credential>,
    pub resources: BTreeMap<String, ResourceOverride>,
    pub retry: RetrySettings,
    pub poll: PollSettings,
    pub request_timeout_secs: u64,
    pub max_response_bytes: usize,
    /// Allow `apiKey` schemes located `in: query`.
    pub allow_secrets_in_url: bool,
    /// Fail loading when any property is dropped as unsupported.
    pub strict_schemas: bool,
    /// Root for `file-secrets://` references; the working directory when unset.
    pub secrets_dir: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            region: None,
            headers: BTreeMap::new(),
            credentials: BTreeMap::new(),
            resources: BTreeMap::new(),
            retry: RetrySettings::default(),
            poll: PollSettings::default(),
            request_timeout_secs: 30,
            max_response_bytes: 10 * 1024 * 1024,
            allow_secrets_in_url: false,
            strict_schemas: false,
            secrets_dir: None,
        }
    }
}

impl ProviderConfig {
    pub fn parse(body: &str) -> Result<Self, EngineError> {
        let cfg: Self = if body.trim_start().starts_with('{') {
            serde_json::from_str(body)
                .map_err(|e| EngineError::config(format!("invalid provider config: {e}")))?
        } else if body.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(body)
                .map_err(|e| EngineError::config(format!("invalid provider config: {e}")))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("read {}: {e}", path.display())))?;
        Self::parse(&body)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let urls = self
            .base_url
            .iter()
            .chain(self.resources.values().filter_map(|r| r.base_url.as_ref()));
        for u in urls {
            url::Url::parse(u)
                .map_err(|e| EngineError::config(format!("invalid base_url '{u}': {e}")))?;
        }
        if self.retry.max_attempts == 0 {
            return Err(EngineError::config("retry.max_attempts must be at least 1"));
        }
        if self.poll.interval_ms == 0 {
            return Err(EngineError::config("poll.interval_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceOverride> {
        self.resources.get(name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Per-resource binding overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceOverride {
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Statuses meaning "retry later".
    pub statuses: Vec<u16>,
    /// Extra headers carrying a retry delay, checked after `Retry-After`.
    pub delay_headers: Vec<DelayHeader>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            statuses: vec![429, 503],
            delay_headers: Vec::new(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            retry_statuses: self.statuses.iter().copied().collect::<BTreeSet<_>>(),
            base_delay: Duration::from_millis(self.base_delay_ms),
            factor: 2.0,
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts.max(1),
            vendor_headers: self
                .delay_headers
                .iter()
                .map(|h| RetryVendorHeader {
                    name: h.name.clone(),
                    kind: h.kind,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayHeader {
    pub name: String,
    #[serde(default)]
    pub kind: VendorHeaderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub interval_ms: u64,
    /// Used when the operation declares no `x-restform-timeout`.
    pub timeout_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            timeout_secs: 600,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A literal credential or a `secrets://` / `file-secrets://` reference.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// `Some` when the value names a secret instead of holding it.
    pub fn secret_ref(&self) -> Option<SecretRef> {
        let scheme = self.0.split_once("://")?.0;
        if !matches!(scheme, "secrets" | "file-secrets") {
            return None;
        }
        SecretRef::parse(&self.0).ok()
    }

    pub(crate) fn literal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secret_ref() {
            Some(r) => write!(f, "Credential({r})"),
            None => f.write_str("Credential(<redacted>)"),
        }
    }
}

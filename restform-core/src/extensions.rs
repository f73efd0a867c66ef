//! OpenAPI extension keys recognized by the engine.
//!
//! Every key below overrides inferred behavior. Keys outside this list,
//! including unknown `x-restform-*` keys, are ignored.
//!
//! | Key | Placement | Effect |
//! |---|---|---|
//! | `x-restform-resource-name` | collection path item or its `post` | resource name |
//! | `x-restform-exclude` | path item or operation | skip it entirely |
//! | `x-restform-computed` | property | server-assigned, never sent |
//! | `x-restform-immutable` | property | settable only on create |
//! | `x-restform-sensitive` | property | value is never logged |
//! | `x-restform-id` | property | identifier used for the instance path |
//! | `x-restform-field-name` | property | name exposed to the host |
//! | `x-restform-discriminator` | `oneOf`/`anyOf` schema | discriminator property |
//! | `x-restform-async` | operation | completion must be polled |
//! | `x-restform-status-field` | operation | status property (default `status`) |
//! | `x-restform-pending-statuses` | operation | values meaning "still running" |
//! | `x-restform-target-statuses` | operation | values meaning "done" |
//! | `x-restform-failed-statuses` | operation | values meaning "failed" |
//! | `x-restform-poll-path` | operation | completion endpoint template |
//! | `x-restform-timeout` | operation | poll deadline (`90`, `30s`, `5m`, `1h`) |
//! | `x-restform-base-url` | collection path item or its `post` | base URL binding |
//! | `x-restform-api-version` | collection path item or its `post` | API version binding |
//! | `x-restform-host` | collection path item or its `post` | host template, may contain `${region}` |
//! | `x-restform-regions` | collection path item or its `post` | allowed regions |
//! | `x-restform-list-items` | list operation | array property holding list elements |

use std::time::Duration;

use serde_json::Value as JsonValue;

pub const RESOURCE_NAME: &str = "x-restform-resource-name";
pub const EXCLUDE: &str = "x-restform-exclude";
pub const COMPUTED: &str = "x-restform-computed";
pub const IMMUTABLE: &str = "x-restform-immutable";
pub const SENSITIVE: &str = "x-restform-sensitive";
pub const ID: &str = "x-restform-id";
pub const FIELD_NAME: &str = "x-restform-field-name";
pub const DISCRIMINATOR: &str = "x-restform-discriminator";
pub const ASYNC: &str = "x-restform-async";
pub const STATUS_FIELD: &str = "x-restform-status-field";
pub const PENDING_STATUSES: &str = "x-restform-pending-statuses";
pub const TARGET_STATUSES: &str = "x-restform-target-statuses";
pub const FAILED_STATUSES: &str = "x-restform-failed-statuses";
pub const POLL_PATH: &str = "x-restform-poll-path";
pub const TIMEOUT: &str = "x-restform-timeout";
pub const BASE_URL: &str = "x-restform-base-url";
pub const API_VERSION: &str = "x-restform-api-version";
pub const HOST: &str = "x-restform-host";
pub const REGIONS: &str = "x-restform-regions";
pub const LIST_ITEMS: &str = "x-restform-list-items";

/// Internal annotation left by the loader on every object that replaced a
/// `$ref`, holding the original reference string.
pub const RESOLVED_REF: &str = "$resolvedRef";

pub fn flag(node: &JsonValue, key: &str) -> Option<bool> {
    match node.get(key)? {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn is_set(node: &JsonValue, key: &str) -> bool {
    flag(node, key).unwrap_or(false)
}

pub fn string(node: &JsonValue, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a list of strings, accepting either a YAML/JSON sequence or a
/// comma separated string.
pub fn string_list(node: &JsonValue, key: &str) -> Option<Vec<String>> {
    let out: Vec<String> = match node.get(key)? {
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                JsonValue::String(s) => Some(s.trim().to_string()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        JsonValue::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    Some(out)
}

/// Parses `x-restform-timeout` values: bare seconds or a number with an
/// `s`, `m` or `h` suffix.
pub fn parse_timeout(raw: &JsonValue) -> Option<Duration> {
    match raw {
        JsonValue::Number(n) => n.as_u64().map(Duration::from_secs),
        JsonValue::String(s) => {
            let s = s.trim();
            let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
                Some((idx, _)) => s.split_at(idx),
                None => (s, "s"),
            };
            let n = digits.parse::<u64>().ok()?;
            let secs = match unit.trim() {
                "s" | "sec" | "secs" => n,
                "m" | "min" | "mins" => n.checked_mul(60)?,
                "h" | "hr" | "hrs" => n.checked_mul(3600)?,
                _ => return None,
            };
            Some(Duration::from_secs(secs))
        }
        _ => None,
    }
}

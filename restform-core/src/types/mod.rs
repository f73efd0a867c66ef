use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod field;

pub use field::{FieldKind, FieldSchema, VariantSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Create,
        OperationKind::Read,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::List => "list",
        }
    }

    /// Operations addressed at a single existing instance.
    pub fn targets_instance(self) -> bool {
        matches!(
            self,
            OperationKind::Read | OperationKind::Update | OperationKind::Delete
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(OperationKind::Create),
            "read" | "get" => Ok(OperationKind::Read),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            "list" => Ok(OperationKind::List),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
    /// Field name used to fill the trailing placeholder of the instance path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_api_name(&self, api_name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.api_name == api_name)
    }
}

/// How completion of an asynchronous operation is observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncPolicy {
    pub status_field: String,
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub failed: Vec<String>,
    /// Completion endpoint template; when absent the `Location` header or the
    /// instance read endpoint is polled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_secs", default)]
    pub timeout: Option<Duration>,
}

impl Default for AsyncPolicy {
    fn default() -> Self {
        Self {
            status_field: "status".to_string(),
            pending: ["pending", "in_progress", "running", "queued"]
                .into_iter()
                .map(String::from)
                .collect(),
            target: ["done", "succeeded", "success", "ready", "active", "completed"]
                .into_iter()
                .map(String::from)
                .collect(),
            failed: ["failed", "error", "cancelled"]
                .into_iter()
                .map(String::from)
                .collect(),
            poll_path: None,
            timeout: None,
        }
    }
}

impl AsyncPolicy {
    pub fn is_pending(&self, status: &str) -> bool {
        contains_ci(&self.pending, status)
    }

    pub fn is_target(&self, status: &str) -> bool {
        contains_ci(&self.target, status)
    }

    pub fn is_failed(&self, status: &str) -> bool {
        contains_ci(&self.failed, status)
    }
}

fn contains_ci(values: &[String], status: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(status))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTemplate {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_params: Vec<String>,
    /// Names of the security schemes that must be satisfied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asynchronous: Option<AsyncPolicy>,
    /// Array property of a list response holding the elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_items: Option<String>,
}

/// Where a resource lives when it differs from the provider default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Version segment found in (or declared for) the resource paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub schema: ResourceSchema,
    pub operations: BTreeMap<OperationKind, EndpointTemplate>,
    #[serde(default)]
    pub binding: ResourceBinding,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn operation(&self, kind: OperationKind) -> Option<&EndpointTemplate> {
        self.operations.get(&kind)
    }

    pub fn supports(&self, kind: OperationKind) -> bool {
        self.operations.contains_key(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecurityScheme {
    ApiKeyHeader { name: String },
    ApiKeyQuery { name: String },
    Bearer,
    Basic,
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

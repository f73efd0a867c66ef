//! Redaction of credentials and sensitive fields before anything is logged
//! or printed.

use std::collections::BTreeMap;

use restform_core::{FieldKind, FieldSchema};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::planner::OperationPlan;

const REDACTED: &str = "<redacted>";

/// Always redacted, whatever their origin.
const ALWAYS_REDACT: [&str; 4] = ["authorization", "proxy-authorization", "cookie", "set-cookie"];

pub fn redact_headers(
    headers: &BTreeMap<String, String>,
    secret_headers: &[String],
) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            let secret = ALWAYS_REDACT.iter().any(|h| k.eq_ignore_ascii_case(h))
                || secret_headers.iter().any(|h| k.eq_ignore_ascii_case(h));
            let v = if secret { REDACTED.to_string() } else { v.clone() };
            (k.clone(), v)
        })
        .collect()
}

pub fn redact_url(url: &url::Url, secret_query: &[String]) -> String {
    if secret_query.is_empty() || url.query().is_none() {
        return url.to_string();
    }
    let mut out = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if secret_query.iter().any(|s| *s == k) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out.to_string()
}

/// Copy of a wire payload with every sensitive field replaced by a marker.
pub fn redact_payload(fields: &[FieldSchema], value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(obj) => JsonValue::Object(redact_object(fields, obj)),
        other => other.clone(),
    }
}

fn redact_object(fields: &[FieldSchema], obj: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut out = obj.clone();
    for f in fields {
        let Some(v) = out.get_mut(&f.api_name) else {
            continue;
        };
        if f.sensitive {
            *v = JsonValue::String(REDACTED.to_string());
        } else {
            *v = redact_value(&f.kind, v);
        }
    }
    out
}

fn redact_value(kind: &FieldKind, value: &JsonValue) -> JsonValue {
    match (kind, value) {
        (FieldKind::Object { fields }, JsonValue::Object(m)) => {
            JsonValue::Object(redact_object(fields, m))
        }
        (FieldKind::List { items }, JsonValue::Array(a)) => {
            JsonValue::Array(a.iter().map(|v| redact_value(items, v)).collect())
        }
        (FieldKind::Map { values }, JsonValue::Object(m)) => JsonValue::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), redact_value(values, v)))
                .collect(),
        ),
        // Unknown variants are redacted across every declared shape.
        (FieldKind::Variant(set), JsonValue::Object(m)) => {
            let mut out = m.clone();
            for fields in set.variants.values() {
                out = redact_object(fields, &out);
            }
            JsonValue::Object(out)
        }
        _ => value.clone(),
    }
}

/// Printable form of an [`OperationPlan`].
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub resource: String,
    pub operation: String,
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
    pub asynchronous: bool,
}

impl PlanView {
    pub fn new(plan: &OperationPlan, fields: &[FieldSchema]) -> Self {
        Self {
            resource: plan.resource.clone(),
            operation: plan.operation.to_string(),
            method: plan.method.clone(),
            url: redact_url(&plan.url, &plan.secret_query),
            headers: redact_headers(&plan.headers, &plan.secret_headers),
            body: plan
                .body
                .as_ref()
                .map(|b| redact_payload(fields, b)),
            asynchronous: plan.asynchronous.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_redacted_case_insensitively() {
        let headers = BTreeMap::from([
            ("Authorization".to_string(), "Bearer x".to_string()),
            ("X-Api-Key".to_string(), "k".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]);
        let out = redact_headers(&headers, &["x-api-key".to_string()]);
        assert_eq!(out["Authorization"], REDACTED);
        assert_eq!(out["X-Api-Key"], REDACTED);
        assert_eq!(out["Accept"], "application/json");
    }

    #[test]
    fn nested_sensitive_fields_are_redacted() {
        let mut password = FieldSchema::new("password", FieldKind::String);
        password.sensitive = true;
        let fields = vec![
            FieldSchema::new("name", FieldKind::String),
            FieldSchema::new(
                "auth",
                FieldKind::List {
                    items: Box::new(FieldKind::Object {
                        fields: vec![password],
                    }),
                },
            ),
        ];
        let body = json!({"name": "a", "auth": [{"password": "p", "user": "u"}]});
        assert_eq!(
            redact_payload(&fields, &body),
            json!({"name": "a", "auth": [{"password": REDACTED, "user": "u"}]})
        );
    }

    #[test]
    fn secret_query_values_are_hidden() {
        let url = url::Url::parse("https://h.example/w?key=abc&page=2").unwrap();
        assert_eq!(
            redact_url(&url, &["key".to_string()]),
            "https://h.example/w?key=%3Credacted%3E&page=2"
        );
    }
}

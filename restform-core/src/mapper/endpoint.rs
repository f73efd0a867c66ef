use serde_json::Value as JsonValue;

use crate::extensions;
use crate::loader::security_names;
use crate::template::path_version;
use crate::types::{AsyncPolicy, EndpointTemplate, ResourceBinding};

use super::paths::CrudPair;

/// Builds the endpoint template for one operation of a path item.
pub(crate) fn endpoint(
    path: &str,
    item: &JsonValue,
    method: &str,
    op: &JsonValue,
    global_security: &[String],
) -> EndpointTemplate {
    let mut query_params = Vec::new();
    for params in [item.get("parameters"), op.get("parameters")]
        .into_iter()
        .flatten()
        .filter_map(|p| p.as_array())
    {
        for p in params {
            if p.get("in").and_then(|v| v.as_str()) != Some("query") {
                continue;
            }
            if let Some(name) = p.get("name").and_then(|v| v.as_str()) {
                if !query_params.iter().any(|q| q == name) {
                    query_params.push(name.to_string());
                }
            }
        }
    }

    EndpointTemplate {
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        query_params,
        security: security_names(op.get("security"))
            .unwrap_or_else(|| global_security.to_vec()),
        asynchronous: async_policy(op),
        list_items: extensions::string(op, extensions::LIST_ITEMS),
    }
}

/// `x-restform-async` decides; without it a declared `202` response implies
/// asynchronous completion.
fn async_policy(op: &JsonValue) -> Option<AsyncPolicy> {
    let declared_202 = op
        .get("responses")
        .and_then(|r| r.as_object())
        .is_some_and(|r| r.contains_key("202"));
    if !extensions::flag(op, extensions::ASYNC).unwrap_or(declared_202) {
        return None;
    }

    let mut policy = AsyncPolicy::default();
    if let Some(field) = extensions::string(op, extensions::STATUS_FIELD) {
        policy.status_field = field;
    }
    if let Some(values) = extensions::string_list(op, extensions::PENDING_STATUSES) {
        policy.pending = values;
    }
    if let Some(values) = extensions::string_list(op, extensions::TARGET_STATUSES) {
        policy.target = values;
    }
    if let Some(values) = extensions::string_list(op, extensions::FAILED_STATUSES) {
        policy.failed = values;
    }
    policy.poll_path = extensions::string(op, extensions::POLL_PATH);
    policy.timeout = op.get(extensions::TIMEOUT).and_then(extensions::parse_timeout);
    Some(policy)
}

/// Binding keys are read from the `post` operation first, then from the
/// collection path item.
pub(crate) fn binding(pair: &CrudPair<'_>) -> ResourceBinding {
    let post = super::paths::operation(pair.collection, "post");
    let lookup_str = |key: &str| {
        post.and_then(|op| extensions::string(op, key))
            .or_else(|| extensions::string(pair.collection, key))
    };
    let regions = post
        .and_then(|op| extensions::string_list(op, extensions::REGIONS))
        .or_else(|| extensions::string_list(pair.collection, extensions::REGIONS))
        .unwrap_or_default();

    ResourceBinding {
        base_url: lookup_str(extensions::BASE_URL)
            .or_else(|| crate::loader::first_server_url(pair.collection)),
        api_version: lookup_str(extensions::API_VERSION)
            .or_else(|| path_version(pair.collection_path).map(str::to_string)),
        host_template: lookup_str(extensions::HOST),
        regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn a_202_response_implies_async_with_defaults() {
        let op = json!({"responses": {"202": {}}});
        let ep = endpoint("/w", &json!({}), "post", &op, &[]);
        let policy = ep.asynchronous.unwrap();
        assert_eq!(policy.status_field, "status");
        assert!(policy.is_pending("PENDING"));
        assert_eq!(policy.timeout, None);
    }

    #[test]
    fn explicit_flag_overrides_202() {
        let op = json!({"x-restform-async": false, "responses": {"202": {}}});
        assert!(endpoint("/w", &json!({}), "post", &op, &[]).asynchronous.is_none());
    }

    #[test]
    fn async_extensions_customize_policy() {
        let op = json!({
            "x-restform-async": true,
            "x-restform-status-field": "state",
            "x-restform-target-statuses": "ok",
            "x-restform-poll-path": "/operations/{operation_id}",
            "x-restform-timeout": "5m"
        });
        let policy = endpoint("/w", &json!({}), "post", &op, &[]).asynchronous.unwrap();
        assert_eq!(policy.status_field, "state");
        assert_eq!(policy.target, vec!["ok".to_string()]);
        assert_eq!(policy.poll_path.as_deref(), Some("/operations/{operation_id}"));
        assert_eq!(policy.timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn query_params_and_security() {
        let item = json!({"parameters": [{"name": "project", "in": "query"}, {"name": "id", "in": "path"}]});
        let op = json!({
            "parameters": [{"name": "dry_run", "in": "query"}, {"name": "project", "in": "query"}],
            "security": []
        });
        let ep = endpoint("/w/{id}", &item, "get", &op, &["key".to_string()]);
        assert_eq!(ep.method, "GET");
        assert_eq!(ep.query_params, vec!["project".to_string(), "dry_run".to_string()]);
        assert!(ep.security.is_empty());

        let inherited = endpoint("/w/{id}", &item, "get", &json!({}), &["key".to_string()]);
        assert_eq!(inherited.security, vec!["key".to_string()]);
    }
}

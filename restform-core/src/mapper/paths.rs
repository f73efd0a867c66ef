use serde_json::{Map, Value as JsonValue};

use crate::extensions;
use crate::template::{is_version_segment, path_version, segment_placeholder, segments};

/// A collection path and the instance path nested directly beneath it.
#[derive(Debug, Clone)]
pub(crate) struct CrudPair<'a> {
    pub collection_path: &'a str,
    pub collection: &'a JsonValue,
    pub instance_path: &'a str,
    pub instance: &'a JsonValue,
    /// Trailing placeholder of the instance path.
    pub instance_param: String,
}

/// The operation object for `method`, unless absent or excluded.
pub(crate) fn operation<'a>(item: &'a JsonValue, method: &str) -> Option<&'a JsonValue> {
    item.get(method)
        .filter(|op| op.is_object() && !extensions::is_set(op, extensions::EXCLUDE))
}

/// Finds every `P` + `P/{param}` pair. Paths with no partner produce nothing.
pub(crate) fn discover(paths: &Map<String, JsonValue>) -> Vec<CrudPair<'_>> {
    let mut out = Vec::new();
    for (path, item) in paths {
        if excluded(item) {
            continue;
        }
        let collection = normalize(path);
        let is_instance_like = segments(collection)
            .last()
            .is_some_and(|s| segment_placeholder(s).is_some());
        if collection.is_empty() || is_instance_like {
            continue;
        }

        let instance = paths.iter().find_map(|(candidate, inst_item)| {
            if excluded(inst_item) {
                return None;
            }
            let rest = normalize(candidate).strip_prefix(collection)?.strip_prefix('/')?;
            if rest.contains('/') {
                return None;
            }
            segment_placeholder(rest).map(|param| (candidate.as_str(), inst_item, param.to_string()))
        });

        if let Some((instance_path, inst_item, param)) = instance {
            out.push(CrudPair {
                collection_path: path,
                collection: item,
                instance_path,
                instance: inst_item,
                instance_param: param,
            });
        }
    }
    out
}

pub(crate) fn resource_name(pair: &CrudPair<'_>) -> String {
    let explicit = operation(pair.collection, "post")
        .and_then(|op| extensions::string(op, extensions::RESOURCE_NAME))
        .or_else(|| extensions::string(pair.collection, extensions::RESOURCE_NAME));
    if let Some(name) = explicit {
        return name;
    }

    let last_static = segments(pair.collection_path)
        .filter(|s| segment_placeholder(s).is_none() && !is_version_segment(s))
        .last()
        .unwrap_or("resource");
    let base = sanitize(&singularize(last_static));
    match path_version(pair.collection_path) {
        Some(v) => format!("{base}_{v}"),
        None => base,
    }
}

fn excluded(item: &JsonValue) -> bool {
    extensions::is_set(item, extensions::EXCLUDE)
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        ""
    } else {
        trimmed
    }
}

fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.len() > 3 && lower.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with("ss") || !lower.ends_with('s') || lower.len() == 1 {
        return word.to_string();
    }
    word[..word.len() - 1].to_string()
}

fn sanitize(word: &str) -> String {
    word.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn singular_forms() {
        assert_eq!(singularize("widgets"), "widget");
        assert_eq!(singularize("policies"), "policy");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("access"), "access");
    }

    #[test]
    fn pairs_require_a_trailing_placeholder_partner() {
        let paths = json!({
            "/widgets": {"post": {}},
            "/widgets/{id}": {"get": {}},
            "/widgets/{id}/actions/start": {"post": {}},
            "/health": {"get": {}},
            "/gadgets/": {"post": {}},
            "/gadgets/{gadget_id}": {"get": {}}
        });
        let paths = paths.as_object().unwrap();
        let found = discover(paths);
        let collections: Vec<_> = found.iter().map(|p| p.collection_path).collect();
        assert_eq!(collections, vec!["/gadgets/", "/widgets"]);
        assert_eq!(found[0].instance_param, "gadget_id");
    }

    #[test]
    fn versioned_and_named_resources() {
        let paths = json!({
            "/v1/cdns": {"post": {}},
            "/v1/cdns/{id}": {"get": {}},
            "/things": {"x-restform-resource-name": "gizmo", "post": {}},
            "/things/{id}": {"get": {}}
        });
        let paths = paths.as_object().unwrap();
        let names: Vec<_> = discover(paths).iter().map(resource_name).collect();
        assert_eq!(names, vec!["gizmo".to_string(), "cdn_v1".to_string()]);
    }
}

use serde_json::{Map, Value as JsonValue};

use crate::error::LoadError;
use crate::extensions::RESOLVED_REF;

/// Returns a copy of `raw` with every local `$ref` under `paths` inlined.
pub(crate) fn resolve_document(raw: &JsonValue) -> Result<JsonValue, LoadError> {
    let mut out = raw.clone();
    if let (Some(paths), Some(obj)) = (raw.get("paths"), out.as_object_mut()) {
        let mut stack = Vec::new();
        let resolved = resolve_node(raw, paths, "#/paths", &mut stack)?;
        obj.insert("paths".to_string(), resolved);
    }
    Ok(out)
}

fn resolve_node(
    root: &JsonValue,
    node: &JsonValue,
    at: &str,
    stack: &mut Vec<String>,
) -> Result<JsonValue, LoadError> {
    match node {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(r)) = map.get("$ref") {
                return resolve_ref(root, map, r, at, stack);
            }
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let child = format!("{at}/{}", escape_token(k));
                out.insert(k.clone(), resolve_node(root, v, &child, stack)?);
            }
            Ok(JsonValue::Object(out))
        }
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| resolve_node(root, v, &format!("{at}/{i}"), stack))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        other => Ok(other.clone()),
    }
}

fn resolve_ref(
    root: &JsonValue,
    map: &Map<String, JsonValue>,
    reference: &str,
    at: &str,
    stack: &mut Vec<String>,
) -> Result<JsonValue, LoadError> {
    let unresolved = || LoadError::UnresolvedReference {
        reference: reference.to_string(),
        pointer: at.to_string(),
    };

    // Only document-local references are supported.
    let pointer = reference.strip_prefix('#').ok_or_else(unresolved)?;
    if stack.iter().any(|s| s == reference) {
        let mut marker = Map::new();
        marker.insert("$ref".to_string(), JsonValue::String(reference.to_string()));
        return Ok(JsonValue::Object(marker));
    }
    let target = root.pointer(pointer).ok_or_else(unresolved)?;

    stack.push(reference.to_string());
    let resolved = resolve_node(root, target, reference, stack);
    stack.pop();
    let mut resolved = resolved?;

    if let JsonValue::Object(obj) = &mut resolved {
        // OpenAPI 3.1 allows siblings next to `$ref`; they override the target.
        for (k, v) in map.iter().filter(|(k, _)| k.as_str() != "$ref") {
            let child = format!("{at}/{}", escape_token(k));
            obj.insert(k.clone(), resolve_node(root, v, &child, stack)?);
        }
        obj.insert(
            RESOLVED_REF.to_string(),
            JsonValue::String(reference.to_string()),
        );
    }
    Ok(resolved)
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inlines_nested_references() {
        let raw = json!({
            "paths": {"/a": {"get": {"responses": {"200": {"$ref": "#/components/responses/Ok"}}}}},
            "components": {
                "responses": {"Ok": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/A"}}}}},
                "schemas": {"A": {"type": "object", "properties": {"id": {"type": "string"}}}}
            }
        });
        let out = resolve_document(&raw).unwrap();
        let schema = out
            .pointer("/paths/~1a/get/responses/200/content/application~1json/schema")
            .unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema[RESOLVED_REF], "#/components/schemas/A");
    }

    #[test]
    fn missing_target_is_reported_with_location() {
        let raw = json!({"paths": {"/a": {"$ref": "#/components/pathItems/nope"}}});
        match resolve_document(&raw).unwrap_err() {
            LoadError::UnresolvedReference { reference, pointer } => {
                assert_eq!(reference, "#/components/pathItems/nope");
                assert_eq!(pointer, "#/paths/~1a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn external_reference_is_unresolved() {
        let raw = json!({"paths": {"/a": {"$ref": "other.yaml#/x"}}});
        assert!(matches!(
            resolve_document(&raw),
            Err(LoadError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn cycles_leave_a_marker() {
        let raw = json!({
            "paths": {"/n": {"get": {"schema": {"$ref": "#/components/schemas/Node"}}}},
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"child": {"$ref": "#/components/schemas/Node"}}
            }}}
        });
        let out = resolve_document(&raw).unwrap();
        let child = out
            .pointer("/paths/~1n/get/schema/properties/child")
            .unwrap();
        assert_eq!(child, &json!({"$ref": "#/components/schemas/Node"}));
    }
}

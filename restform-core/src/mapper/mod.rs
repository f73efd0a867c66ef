//! Derives resource schemas and endpoint templates from a loaded document.
//!
//! Only collection/instance path pairs (`P` and `P/{param}`) produce
//! resources; every other path is ignored.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

use crate::error::{LoadError, UnsupportedSchema};
use crate::loader::SpecDocument;
use crate::template;
use crate::types::{CatalogEntry, EndpointTemplate, OperationKind, ResourceSchema};

mod endpoint;
mod fields;
mod paths;

use fields::{FieldSources, MapCtx, ObjectShape};
use paths::CrudPair;

#[derive(Debug, Clone, Copy, Default)]
pub struct MapOptions {
    /// Treat the first dropped property as a load failure.
    pub strict: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MappedResources {
    pub entries: Vec<CatalogEntry>,
    pub warnings: Vec<UnsupportedSchema>,
}

pub fn map_resources(doc: &SpecDocument, opts: MapOptions) -> Result<MappedResources, LoadError> {
    let global_security = doc.global_security();
    let mut out = MappedResources::default();
    let mut seen = BTreeSet::new();

    for pair in paths::discover(doc.paths()) {
        let name = paths::resource_name(&pair);
        if !seen.insert(name.clone()) {
            return Err(LoadError::malformed(format!(
                "duplicate resource name '{name}' (from {}); set x-restform-resource-name to disambiguate",
                pair.collection_path
            )));
        }

        let before = out.warnings.len();
        let entry = map_pair(&name, &pair, &global_security, &mut out.warnings)?;
        for w in &out.warnings[before..] {
            tracing::warn!(resource = %w.resource, field = %w.field, reason = %w.reason, "dropping unsupported property");
        }
        if opts.strict {
            if let Some(first) = out.warnings.first() {
                return Err(LoadError::UnsupportedSchema(first.clone()));
            }
        }
        if let Some(entry) = entry {
            tracing::debug!(
                resource = %name,
                operations = entry.operations.len(),
                fields = entry.schema.fields.len(),
                "mapped resource"
            );
            out.entries.push(entry);
        }
    }
    Ok(out)
}

/// `Ok(None)` when the pair has neither create nor read and is skipped.
fn map_pair(
    name: &str,
    pair: &CrudPair<'_>,
    global_security: &[String],
    warnings: &mut Vec<UnsupportedSchema>,
) -> Result<Option<CatalogEntry>, LoadError> {
    let create = paths::operation(pair.collection, "post");
    let list = paths::operation(pair.collection, "get");
    let read = paths::operation(pair.instance, "get");
    let (update_method, update) = match paths::operation(pair.instance, "put") {
        Some(op) => ("put", Some(op)),
        None => ("patch", paths::operation(pair.instance, "patch")),
    };
    let delete = paths::operation(pair.instance, "delete");

    if create.is_none() && read.is_none() {
        if list.is_some() || update.is_some() || delete.is_some() {
            return Err(LoadError::incomplete(
                name,
                format!(
                    "{} has neither a create nor a read operation",
                    pair.collection_path
                ),
            ));
        }
        return Ok(None);
    }

    let mut operations = BTreeMap::<OperationKind, EndpointTemplate>::new();
    let collection_ops = [(OperationKind::Create, "post", create), (OperationKind::List, "get", list)];
    for (kind, method, op) in collection_ops {
        if let Some(op) = op {
            let mut ep = endpoint::endpoint(pair.collection_path, pair.collection, method, op, global_security);
            if kind == OperationKind::List && ep.list_items.is_none() {
                ep.list_items = declared_list_items(op, pair.collection_path);
            }
            operations.insert(kind, ep);
        }
    }
    let instance_ops = [
        (OperationKind::Read, "get", read),
        (OperationKind::Update, update_method, update),
        (OperationKind::Delete, "delete", delete),
    ];
    for (kind, method, op) in instance_ops {
        if let Some(op) = op {
            let ep = endpoint::endpoint(pair.instance_path, pair.instance, method, op, global_security);
            operations.insert(kind, ep);
        }
    }

    let mut response = ObjectShape::default();
    let mut has_response = false;
    for op in [read, create, update].into_iter().flatten() {
        if let Some(shape) = response_schema(op).and_then(fields::object_shape) {
            response.absorb(shape);
            has_response = true;
        }
    }
    let sources = FieldSources {
        create: create.and_then(request_schema).and_then(fields::object_shape),
        update: update.and_then(request_schema).and_then(fields::object_shape),
        response: has_response.then_some(response),
    };

    let mut ctx = MapCtx {
        resource: name,
        warnings,
    };
    let (fields, identifier) = fields::build_fields(&mut ctx, &sources, &pair.instance_param)?;

    Ok(Some(CatalogEntry {
        schema: ResourceSchema {
            name: name.to_string(),
            fields,
            identifier,
        },
        operations,
        binding: endpoint::binding(pair),
    }))
}

fn request_schema(op: &JsonValue) -> Option<&JsonValue> {
    json_media(op.get("requestBody")?.get("content")?)?.get("schema")
}

fn response_schema(op: &JsonValue) -> Option<&JsonValue> {
    let responses = op.get("responses")?.as_object()?;
    ["200", "201", "202", "2XX", "2xx"]
        .iter()
        .filter_map(|code| responses.get(*code))
        .find_map(|r| json_media(r.get("content")?)?.get("schema"))
}

/// Array property of the list response schema that holds the instances:
/// the only array-typed property, else the one named after the collection.
fn declared_list_items(op: &JsonValue, collection_path: &str) -> Option<String> {
    let shape = response_schema(op).and_then(fields::object_shape)?;
    let arrays: Vec<&str> = shape
        .properties
        .iter()
        .filter(|(_, schema)| fields::schema_type(schema) == Some("array"))
        .map(|(name, _)| name.as_str())
        .collect();
    if let [only] = arrays.as_slice() {
        return Some(only.to_string());
    }
    let collection = template::segments(collection_path)
        .filter(|s| template::segment_placeholder(s).is_none())
        .last()?;
    arrays
        .into_iter()
        .find(|name| *name == collection)
        .map(str::to_string)
}

/// `application/json`, else the first `+json` type, else anything mentioning json.
fn json_media(content: &JsonValue) -> Option<&JsonValue> {
    let content = content.as_object()?;
    content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(k, _)| k.split(';').next().is_some_and(|t| t.trim().ends_with("+json")))
                .map(|(_, v)| v)
        })
        .or_else(|| content.iter().find(|(k, _)| k.contains("json")).map(|(_, v)| v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn media_type_preference() {
        let content = json!({
            "text/plain": {"schema": {"type": "string"}},
            "application/merge-patch+json": {"schema": {"type": "object"}},
        });
        assert_eq!(json_media(&content).unwrap()["schema"]["type"], "object");
        let content = json!({"application/json": {"n": 1}, "application/x+json": {"n": 2}});
        assert_eq!(json_media(&content).unwrap()["n"], 1);
    }

    #[test]
    fn list_items_come_from_the_response_schema() {
        let wrapped = |props: JsonValue| {
            json!({"responses": {"200": {"content": {"application/json": {"schema": {
                "type": "object",
                "properties": props
            }}}}}})
        };

        let single = wrapped(json!({"next": {"type": "string"}, "data": {"type": "array"}}));
        assert_eq!(declared_list_items(&single, "/widgets").as_deref(), Some("data"));

        let named = wrapped(json!({"errors": {"type": "array"}, "widgets": {"type": "array"}}));
        assert_eq!(declared_list_items(&named, "/v1/widgets").as_deref(), Some("widgets"));

        let unclear = wrapped(json!({"a": {"type": "array"}, "b": {"type": "array"}}));
        assert_eq!(declared_list_items(&unclear, "/widgets"), None);

        let bare = json!({"responses": {"200": {"content": {"application/json": {"schema": {"type": "array"}}}}}});
        assert_eq!(declared_list_items(&bare, "/widgets"), None);
    }

    #[test]
    fn response_schema_uses_first_success_code() {
        let op = json!({"responses": {
            "404": {"content": {"application/json": {"schema": {"title": "err"}}}},
            "201": {"content": {"application/json": {"schema": {"title": "ok"}}}}
        }});
        assert_eq!(response_schema(&op).unwrap()["title"], "ok");
    }
}

use restform_core::{FieldKind, FieldSchema, OperationKind, VariantSet};
use serde_json::{Map, Value as JsonValue};

use crate::reconciler::InstanceState;

/// Request body for `operation` built from host state: only fields legal
/// for the operation, keyed by wire name.
pub(crate) fn encode(fields: &[FieldSchema], state: &InstanceState, operation: OperationKind) -> JsonValue {
    JsonValue::Object(encode_object(fields, state, operation))
}

fn encode_object(fields: &[FieldSchema], obj: &Map<String, JsonValue>, operation: OperationKind) -> Map<String, JsonValue> {
    let mut out = Map::new();
    for f in fields {
        let legal = match operation {
            OperationKind::Update => f.writable_on_update(),
            _ => f.writable_on_create(),
        };
        if !legal {
            continue;
        }
        match obj.get(&f.name) {
            None | Some(JsonValue::Null) => {}
            Some(v) => {
                out.insert(f.api_name.clone(), encode_value(&f.kind, v, operation));
            }
        }
    }
    out
}

fn encode_value(kind: &FieldKind, value: &JsonValue, operation: OperationKind) -> JsonValue {
    match (kind, value) {
        (FieldKind::Object { fields }, JsonValue::Object(m)) => {
            JsonValue::Object(encode_object(fields, m, operation))
        }
        (FieldKind::List { items }, JsonValue::Array(a)) => {
            JsonValue::Array(a.iter().map(|v| encode_value(items, v, operation)).collect())
        }
        (FieldKind::Map { values }, JsonValue::Object(m)) => JsonValue::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), encode_value(values, v, operation)))
                .collect(),
        ),
        (FieldKind::Variant(set), JsonValue::Object(m)) => {
            let Some(tag) = discriminator_value(set, m) else {
                return value.clone();
            };
            let Some(fields) = set.variant(&tag) else {
                // Let the remote reject it; never coerce into another shape.
                return value.clone();
            };
            let mut out = encode_object(fields, m, operation);
            out.entry(set.discriminator.clone())
                .or_insert(JsonValue::String(tag));
            JsonValue::Object(out)
        }
        _ => value.clone(),
    }
}

/// Discriminator value in host state, where the property may be exposed
/// under a different field name than on the wire.
pub(crate) fn discriminator_value(set: &VariantSet, obj: &Map<String, JsonValue>) -> Option<String> {
    let host_name = set
        .variants
        .values()
        .flatten()
        .find(|f| f.api_name == set.discriminator)
        .map(|f| f.name.as_str())
        .unwrap_or(set.discriminator.as_str());
    obj.get(host_name)
        .or_else(|| obj.get(&set.discriminator))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

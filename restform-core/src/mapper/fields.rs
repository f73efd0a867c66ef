use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

use crate::error::{LoadError, UnsupportedSchema};
use crate::extensions::{self, RESOLVED_REF};
use crate::types::{FieldKind, FieldSchema, VariantSet};

/// Properties of an object schema with `allOf` members folded in.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectShape {
    pub properties: Vec<(String, JsonValue)>,
    pub required: BTreeSet<String>,
}

impl ObjectShape {
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Adds properties from `other` that are not already present.
    pub fn absorb(&mut self, other: ObjectShape) {
        for (k, v) in other.properties {
            if !self.has(&k) {
                self.properties.push((k, v));
            }
        }
        self.required.extend(other.required);
    }

    fn upsert(&mut self, name: &str, schema: &JsonValue) {
        match self.properties.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = schema.clone(),
            None => self.properties.push((name.to_string(), schema.clone())),
        }
    }
}

pub(crate) fn object_shape(schema: &JsonValue) -> Option<ObjectShape> {
    let mut shape = ObjectShape::default();
    collect_shape(schema, &mut shape);
    if shape.properties.is_empty() && schema_type(schema) != Some("object") {
        return None;
    }
    Some(shape)
}

fn collect_shape(schema: &JsonValue, shape: &mut ObjectShape) {
    if let Some(members) = schema.get("allOf").and_then(|v| v.as_array()) {
        for m in members {
            collect_shape(m, shape);
        }
    }
    if let Some(props) = schema.get("properties").and_then(|v| v.as_object()) {
        for (k, v) in props {
            shape.upsert(k, v);
        }
    }
    if let Some(req) = schema.get("required").and_then(|v| v.as_array()) {
        shape
            .required
            .extend(req.iter().filter_map(|r| r.as_str()).map(str::to_string));
    }
}

/// The request/response shapes a resource's fields are derived from.
#[derive(Debug, Default)]
pub(crate) struct FieldSources {
    pub create: Option<ObjectShape>,
    pub update: Option<ObjectShape>,
    pub response: Option<ObjectShape>,
}

impl FieldSources {
    fn in_create(&self, name: &str) -> bool {
        self.create.as_ref().is_some_and(|s| s.has(name))
    }

    fn in_update(&self, name: &str) -> bool {
        self.update.as_ref().is_some_and(|s| s.has(name))
    }

    fn in_response(&self, name: &str) -> bool {
        self.response.as_ref().is_some_and(|s| s.has(name))
    }

    fn required_on_create(&self, name: &str) -> bool {
        self.create.as_ref().is_some_and(|s| s.required.contains(name))
    }

    fn names(&self) -> Vec<String> {
        let mut out = Vec::<String>::new();
        for shape in [&self.create, &self.update, &self.response].into_iter().flatten() {
            for (k, _) in &shape.properties {
                if !out.contains(k) {
                    out.push(k.clone());
                }
            }
        }
        out
    }

    /// Schemas for `name`, in create → update → response order.
    fn schemas(&self, name: &str) -> Vec<&JsonValue> {
        [&self.create, &self.update, &self.response]
            .into_iter()
            .flatten()
            .filter_map(|s| s.get(name))
            .collect()
    }
}

pub(crate) struct MapCtx<'a> {
    pub resource: &'a str,
    pub warnings: &'a mut Vec<UnsupportedSchema>,
}

impl MapCtx<'_> {
    fn drop_property(&mut self, field: &str, reason: &str) {
        self.warnings
            .push(UnsupportedSchema::new(self.resource, field, reason));
    }
}

/// Builds the top-level fields of a resource and picks its identifier.
pub(crate) fn build_fields(
    ctx: &mut MapCtx<'_>,
    sources: &FieldSources,
    instance_param: &str,
) -> Result<(Vec<FieldSchema>, Option<String>), LoadError> {
    let mut fields = Vec::new();
    let mut marked_id: Option<String> = None;

    for api_name in sources.names() {
        let schemas = sources.schemas(&api_name);
        let Some(primary) = schemas.first().copied() else {
            continue;
        };

        let explicit = |key: &str| schemas.iter().find_map(|s| extensions::flag(s, key));
        let read_only = schemas
            .iter()
            .any(|s| s.get("readOnly").and_then(|v| v.as_bool()) == Some(true));
        let response_only = !sources.in_create(&api_name)
            && !sources.in_update(&api_name)
            && sources.in_response(&api_name);

        let computed = explicit(extensions::COMPUTED).unwrap_or(read_only || response_only);
        let required = sources.required_on_create(&api_name) && !computed;

        let kind = match map_kind(ctx, &api_name, primary) {
            Ok(k) => k,
            Err(reason) if required => {
                return Err(LoadError::incomplete(
                    ctx.resource,
                    format!("required property '{api_name}' is not representable: {reason}"),
                ));
            }
            Err(reason) => {
                ctx.drop_property(&api_name, &reason);
                continue;
            }
        };

        let field = FieldSchema {
            name: schemas
                .iter()
                .find_map(|s| extensions::string(s, extensions::FIELD_NAME))
                .unwrap_or_else(|| api_name.clone()),
            api_name: api_name.clone(),
            kind,
            required,
            computed,
            immutable: explicit(extensions::IMMUTABLE).unwrap_or(false),
            sensitive: explicit(extensions::SENSITIVE).unwrap_or_else(|| is_password(primary)),
            description: description(primary),
        };
        if marked_id.is_none() && explicit(extensions::ID) == Some(true) {
            marked_id = Some(field.name.clone());
        }
        fields.push(field);
    }

    let identifier = marked_id
        .or_else(|| {
            fields
                .iter()
                .find(|f| f.api_name == instance_param)
                .map(|f| f.name.clone())
        })
        .or_else(|| fields.iter().find(|f| f.api_name == "id").map(|f| f.name.clone()));

    Ok((fields, identifier))
}

fn nested_fields(
    ctx: &mut MapCtx<'_>,
    path: &str,
    shape: &ObjectShape,
) -> Result<Vec<FieldSchema>, String> {
    let mut out = Vec::new();
    for (api_name, schema) in &shape.properties {
        let field_path = format!("{path}.{api_name}");
        let computed = extensions::flag(schema, extensions::COMPUTED).unwrap_or_else(|| {
            schema.get("readOnly").and_then(|v| v.as_bool()) == Some(true)
        });
        let required = shape.required.contains(api_name) && !computed;

        let kind = match map_kind(ctx, &field_path, schema) {
            Ok(k) => k,
            Err(reason) if required => {
                return Err(format!("required property '{field_path}': {reason}"));
            }
            Err(reason) => {
                ctx.drop_property(&field_path, &reason);
                continue;
            }
        };

        out.push(FieldSchema {
            name: extensions::string(schema, extensions::FIELD_NAME)
                .unwrap_or_else(|| api_name.clone()),
            api_name: api_name.clone(),
            kind,
            required,
            computed,
            immutable: extensions::is_set(schema, extensions::IMMUTABLE),
            sensitive: extensions::flag(schema, extensions::SENSITIVE)
                .unwrap_or_else(|| is_password(schema)),
            description: description(schema),
        });
    }
    Ok(out)
}

pub(crate) fn map_kind(
    ctx: &mut MapCtx<'_>,
    path: &str,
    schema: &JsonValue,
) -> Result<FieldKind, String> {
    if let Some(r) = schema.get("$ref").and_then(|v| v.as_str()) {
        return Err(format!("recursive reference {r}"));
    }
    if schema.get("not").is_some() {
        return Err("`not` schemas are not supported".to_string());
    }
    if let Some(alts) = schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(|v| v.as_array())
    {
        return map_variants(ctx, path, schema, alts).map(FieldKind::Variant);
    }
    if let Some(members) = schema.get("allOf").and_then(|v| v.as_array()) {
        if let Some(shape) = object_shape(schema) {
            return nested_fields(ctx, path, &shape).map(|fields| FieldKind::Object { fields });
        }
        if let [single] = members.as_slice() {
            return map_kind(ctx, path, single);
        }
        return Err("`allOf` of non-object schemas".to_string());
    }

    match schema_type(schema) {
        Some("string") => Ok(FieldKind::String),
        Some("integer") => Ok(FieldKind::Integer),
        Some("number") => Ok(FieldKind::Number),
        Some("boolean") => Ok(FieldKind::Bool),
        Some("array") => {
            let items = schema
                .get("items")
                .ok_or_else(|| "array without `items`".to_string())?;
            let inner = map_kind(ctx, &format!("{path}[]"), items)?;
            Ok(FieldKind::List {
                items: Box::new(inner),
            })
        }
        Some("object") | None if schema.get("properties").is_some() => {
            let shape = object_shape(schema).unwrap_or_default();
            nested_fields(ctx, path, &shape).map(|fields| FieldKind::Object { fields })
        }
        Some("object") => match schema.get("additionalProperties") {
            Some(values) if values.is_object() && !values.as_object().is_some_and(|o| o.is_empty()) => {
                let inner = map_kind(ctx, &format!("{path}{{}}"), values)?;
                Ok(FieldKind::Map {
                    values: Box::new(inner),
                })
            }
            _ => Err("free-form object".to_string()),
        },
        None => enum_kind(schema).ok_or_else(|| "unconstrained value".to_string()),
        Some(other) => Err(format!("unsupported type '{other}'")),
    }
}

fn map_variants(
    ctx: &mut MapCtx<'_>,
    path: &str,
    schema: &JsonValue,
    alternatives: &[JsonValue],
) -> Result<VariantSet, String> {
    let discriminator = schema
        .pointer("/discriminator/propertyName")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| extensions::string(schema, extensions::DISCRIMINATOR))
        .ok_or_else(|| {
            "combinator without a discriminator (declare `discriminator.propertyName` or x-restform-discriminator)"
                .to_string()
        })?;

    // ref → discriminator value
    let mut by_ref = BTreeMap::<String, String>::new();
    if let Some(mapping) = schema
        .pointer("/discriminator/mapping")
        .and_then(|v| v.as_object())
    {
        for (value, target) in mapping {
            if let Some(t) = target.as_str() {
                let full = if t.starts_with('#') {
                    t.to_string()
                } else {
                    format!("#/components/schemas/{t}")
                };
                by_ref.insert(full, value.clone());
            }
        }
    }

    let mut variants = BTreeMap::new();
    for (i, alt) in alternatives.iter().enumerate() {
        let origin = alt.get(RESOLVED_REF).and_then(|v| v.as_str());
        let key = origin
            .and_then(|r| by_ref.get(r).cloned())
            .or_else(|| single_value(alt, &discriminator))
            .or_else(|| origin.and_then(|r| r.rsplit('/').next()).map(str::to_string))
            .ok_or_else(|| format!("cannot determine the discriminator value of alternative #{i}"))?;

        let shape = object_shape(alt)
            .ok_or_else(|| format!("variant '{key}' is not an object schema"))?;
        let fields = nested_fields(ctx, &format!("{path}<{key}>"), &shape)?;
        if variants.insert(key.clone(), fields).is_some() {
            return Err(format!("duplicate variant '{key}'"));
        }
    }

    Ok(VariantSet {
        discriminator,
        variants,
    })
}

/// `enum: [x]` or `const: x` on the discriminator property of a variant.
fn single_value(alt: &JsonValue, discriminator: &str) -> Option<String> {
    let shape = object_shape(alt)?;
    let prop = shape.get(discriminator)?;
    if let Some(c) = prop.get("const").and_then(|v| v.as_str()) {
        return Some(c.to_string());
    }
    match prop.get("enum").and_then(|v| v.as_array()).map(Vec::as_slice) {
        Some([JsonValue::String(only)]) => Some(only.clone()),
        _ => None,
    }
}

fn enum_kind(schema: &JsonValue) -> Option<FieldKind> {
    let values = schema.get("enum")?.as_array()?;
    if values.is_empty() {
        return None;
    }
    if values.iter().all(|v| v.is_string()) {
        Some(FieldKind::String)
    } else if values.iter().all(|v| v.is_i64() || v.is_u64()) {
        Some(FieldKind::Integer)
    } else if values.iter().all(|v| v.is_number()) {
        Some(FieldKind::Number)
    } else if values.iter().all(|v| v.is_boolean()) {
        Some(FieldKind::Bool)
    } else {
        None
    }
}

pub(crate) fn schema_type(schema: &JsonValue) -> Option<&str> {
    match schema.get("type")? {
        JsonValue::String(s) => Some(s.as_str()),
        // OpenAPI 3.1 type arrays, e.g. ["string", "null"]
        JsonValue::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn is_password(schema: &JsonValue) -> bool {
    schema.get("format").and_then(|v| v.as_str()) == Some("password")
}

fn description(schema: &JsonValue) -> Option<String> {
    schema
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind(schema: JsonValue) -> (Result<FieldKind, String>, Vec<UnsupportedSchema>) {
        let mut warnings = Vec::new();
        let mut ctx = MapCtx {
            resource: "r",
            warnings: &mut warnings,
        };
        let k = map_kind(&mut ctx, "f", &schema);
        (k, warnings)
    }

    #[test]
    fn scalars_and_lists() {
        assert_eq!(kind(json!({"type": "string"})).0, Ok(FieldKind::String));
        assert_eq!(kind(json!({"type": ["integer", "null"]})).0, Ok(FieldKind::Integer));
        assert_eq!(kind(json!({"enum": ["a", "b"]})).0, Ok(FieldKind::String));
        assert_eq!(
            kind(json!({"type": "array", "items": {"type": "boolean"}})).0,
            Ok(FieldKind::List {
                items: Box::new(FieldKind::Bool)
            })
        );
    }

    #[test]
    fn unconstrained_values_are_rejected() {
        assert!(kind(json!({})).0.is_err());
        assert!(kind(json!({"type": "object"})).0.is_err());
        assert!(kind(json!({"type": "array"})).0.is_err());
        assert!(kind(json!({"not": {"type": "string"}})).0.is_err());
    }

    #[test]
    fn typed_additional_properties_become_maps() {
        assert_eq!(
            kind(json!({"type": "object", "additionalProperties": {"type": "string"}})).0,
            Ok(FieldKind::Map {
                values: Box::new(FieldKind::String)
            })
        );
    }

    #[test]
    fn optional_nested_unsupported_property_is_dropped_with_warning() {
        let (k, warnings) = kind(json!({
            "type": "object",
            "properties": {"ok": {"type": "string"}, "blob": {}}
        }));
        match k.unwrap() {
            FieldKind::Object { fields } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].name, "ok");
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "f.blob");
    }

    #[test]
    fn combinator_without_discriminator_is_unsupported() {
        let (k, _) = kind(json!({"oneOf": [{"type": "string"}, {"type": "integer"}]}));
        assert!(k.unwrap_err().contains("discriminator"));
    }

    #[test]
    fn variants_resolve_names_from_mapping_enum_and_ref() {
        let (k, _) = kind(json!({
            "oneOf": [
                {"$resolvedRef": "#/components/schemas/Cat", "type": "object",
                 "properties": {"kind": {"type": "string"}, "lives": {"type": "integer"}}},
                {"type": "object",
                 "properties": {"kind": {"type": "string", "enum": ["dog"]}, "bark": {"type": "boolean"}}},
                {"$resolvedRef": "#/components/schemas/Bird", "type": "object",
                 "properties": {"kind": {"type": "string"}}}
            ],
            "discriminator": {"propertyName": "kind", "mapping": {"cat": "#/components/schemas/Cat"}}
        }));
        let FieldKind::Variant(set) = k.unwrap() else {
            panic!("expected variant");
        };
        assert_eq!(set.discriminator, "kind");
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, vec!["Bird", "cat", "dog"]);
        assert!(set.variant("cat").unwrap().iter().any(|f| f.name == "lives"));
    }
}

//! Maps response payloads back onto host state.

use restform_core::{CatalogEntry, FieldKind, FieldSchema, OperationKind, VariantSet};
use serde_json::{Map, Value as JsonValue};

use crate::error::EngineError;

mod list;

pub use list::InstanceList;

pub(crate) use list::list_elements;

/// Field name → value for one resource instance, as held by the host.
pub type InstanceState = Map<String, JsonValue>;

/// Result of a read or update.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Present(InstanceState),
    /// The instance no longer exists upstream; the host should forget it.
    Gone,
}

impl Outcome {
    pub fn into_state(self) -> Option<InstanceState> {
        match self {
            Outcome::Present(s) => Some(s),
            Outcome::Gone => None,
        }
    }
}

pub(crate) struct Reconciler<'a> {
    entry: &'a CatalogEntry,
    operation: OperationKind,
}

impl<'a> Reconciler<'a> {
    pub fn new(entry: &'a CatalogEntry, operation: OperationKind) -> Self {
        Self { entry, operation }
    }

    /// Response fields over `prior`; the response wins on overlap. Wire
    /// properties the schema does not know are ignored.
    pub fn merge(&self, prior: &InstanceState, body: Option<&JsonValue>) -> Result<InstanceState, EngineError> {
        let mut out = prior.clone();
        match body {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Object(obj)) => {
                let decoded = self.decode_object(&self.entry.schema.fields, obj, "")?;
                out.extend(decoded);
            }
            Some(other) => {
                return Err(self.invalid(format!(
                    "expected an object, got {}",
                    json_type(other)
                )));
            }
        }
        Ok(out)
    }

    /// One element of a list response, decoded on its own.
    pub fn decode_item(&self, item: &JsonValue) -> Result<InstanceState, EngineError> {
        match item {
            JsonValue::Object(obj) => self.decode_object(&self.entry.schema.fields, obj, ""),
            other => Err(self.invalid(format!(
                "list element is {}, expected an object",
                json_type(other)
            ))),
        }
    }

    fn decode_object(
        &self,
        fields: &[FieldSchema],
        obj: &Map<String, JsonValue>,
        path: &str,
    ) -> Result<InstanceState, EngineError> {
        let mut out = Map::new();
        for f in fields {
            let Some(v) = obj.get(&f.api_name) else {
                continue;
            };
            let field_path = join(path, &f.name);
            out.insert(f.name.clone(), self.decode_value(&f.kind, v, obj, &field_path)?);
        }
        Ok(out)
    }

    fn decode_value(
        &self,
        kind: &FieldKind,
        value: &JsonValue,
        parent: &Map<String, JsonValue>,
        path: &str,
    ) -> Result<JsonValue, EngineError> {
        Ok(match (kind, value) {
            (_, JsonValue::Null) => JsonValue::Null,
            (FieldKind::Object { fields }, JsonValue::Object(m)) => {
                JsonValue::Object(self.decode_object(fields, m, path)?)
            }
            (FieldKind::List { items }, JsonValue::Array(a)) => JsonValue::Array(
                a.iter()
                    .enumerate()
                    .map(|(i, v)| self.decode_value(items, v, parent, &format!("{path}[{i}]")))
                    .collect::<Result<_, _>>()?,
            ),
            (FieldKind::Map { values }, JsonValue::Object(m)) => {
                let mut out = Map::new();
                for (k, v) in m {
                    out.insert(k.clone(), self.decode_value(values, v, parent, &format!("{path}.{k}"))?);
                }
                JsonValue::Object(out)
            }
            (FieldKind::Variant(set), JsonValue::Object(m)) => {
                let fields = self.select_variant(set, m, parent, path)?;
                JsonValue::Object(self.decode_object(fields, m, path)?)
            }
            (FieldKind::Variant(set), _) => {
                return Err(self.unknown_variant(set, path, None));
            }
            _ => value.clone(),
        })
    }

    /// The discriminator is read inside the value first, then from the
    /// enclosing object. Unknown or missing values never fall back to a
    /// default shape.
    fn select_variant<'s>(
        &self,
        set: &'s VariantSet,
        value: &Map<String, JsonValue>,
        parent: &Map<String, JsonValue>,
        path: &str,
    ) -> Result<&'s [FieldSchema], EngineError> {
        let tag = value
            .get(&set.discriminator)
            .or_else(|| parent.get(&set.discriminator))
            .and_then(|v| v.as_str());
        match tag {
            Some(t) => set
                .variant(t)
                .ok_or_else(|| self.unknown_variant(set, path, Some(t))),
            None => Err(self.unknown_variant(set, path, None)),
        }
    }

    fn unknown_variant(&self, set: &VariantSet, path: &str, value: Option<&str>) -> EngineError {
        EngineError::UnknownVariant {
            resource: self.entry.name().to_string(),
            operation: self.operation,
            field: path.to_string(),
            value: value.map(str::to_string),
            known: set.names().map(str::to_string).collect(),
        }
    }

    fn invalid(&self, message: String) -> EngineError {
        EngineError::InvalidResponse {
            resource: self.entry.name().to_string(),
            operation: self.operation,
            message,
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

pub(crate) fn json_type(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Name exposed to the host.
    pub name: String,
    /// Property name on the wire.
    pub api_name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Server-assigned; never sent.
    #[serde(default)]
    pub computed: bool,
    /// Settable only on create.
    #[serde(default)]
    pub immutable: bool,
    /// Value never logged.
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSchema {
    pub fn new(api_name: impl Into<String>, kind: FieldKind) -> Self {
        let api_name = api_name.into();
        Self {
            name: api_name.clone(),
            api_name,
            kind,
            required: false,
            computed: false,
            immutable: false,
            sensitive: false,
            description: None,
        }
    }

    /// Whether the field belongs in a create request body.
    pub fn writable_on_create(&self) -> bool {
        !self.computed
    }

    /// Whether the field belongs in an update request body.
    pub fn writable_on_update(&self) -> bool {
        !self.computed && !self.immutable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Bool,
    List { items: Box<FieldKind> },
    Map { values: Box<FieldKind> },
    Object { fields: Vec<FieldSchema> },
    Variant(VariantSet),
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::List { .. } => "list",
            FieldKind::Map { .. } => "map",
            FieldKind::Object { .. } => "object",
            FieldKind::Variant(_) => "variant",
        }
    }
}

/// A closed set of shapes selected by a discriminator value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    /// Wire name of the discriminator property.
    pub discriminator: String,
    /// Discriminator value → fields of that shape.
    pub variants: BTreeMap<String, Vec<FieldSchema>>,
}

impl VariantSet {
    pub fn variant(&self, value: &str) -> Option<&[FieldSchema]> {
        self.variants.get(value).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

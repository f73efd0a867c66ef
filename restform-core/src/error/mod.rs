use thiserror::Error;

/// Errors raised while turning an OpenAPI document into a resource catalog.
///
/// All of them are fatal to initialization: the engine never comes up with a
/// partially valid catalog.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read OpenAPI document from {location}: {message}")]
    Io { location: String, message: String },
    #[error("malformed OpenAPI document: {0}")]
    MalformedSpec(String),
    #[error("unresolved reference '{reference}' at {pointer}")]
    UnresolvedReference { reference: String, pointer: String },
    #[error(transparent)]
    UnsupportedSchema(#[from] UnsupportedSchema),
    #[error("resource '{resource}' cannot be mapped: {reason}")]
    IncompleteResourceSchema { resource: String, reason: String },
}

impl LoadError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSpec(message.into())
    }

    pub fn incomplete(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompleteResourceSchema {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// A property the mapper could not represent.
///
/// Recorded as a warning when the property is optional; it only becomes a
/// hard [`LoadError`] in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("resource '{resource}': property '{field}' is not representable ({reason})")]
pub struct UnsupportedSchema {
    pub resource: String,
    /// Dotted path of the property inside the resource (e.g. `spec.owner`).
    pub field: String,
    pub reason: String,
}

impl UnsupportedSchema {
    pub fn new(
        resource: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

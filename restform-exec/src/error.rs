use std::time::Duration;

use restform_core::{LoadError, OperationKind};

use crate::executor::http::HttpError;

/// Per-call failures returned to the host.
///
/// Transient transport problems are retried before they surface here; every
/// other variant is reported as soon as it happens.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown resource '{resource}'")]
    UnknownResource { resource: String },

    #[error("resource '{resource}' does not support {operation}")]
    UnsupportedOperation {
        resource: String,
        operation: OperationKind,
    },

    #[error("{resource} {operation}: no value for path parameter '{parameter}'")]
    MissingIdentifier {
        resource: String,
        operation: OperationKind,
        parameter: String,
    },

    #[error("{resource} {operation}: request rejected (HTTP {status}): {message}")]
    RemoteRejected {
        resource: String,
        operation: OperationKind,
        status: u16,
        message: String,
    },

    #[error("{resource} {operation}: remote failure (HTTP {status}): {message}")]
    RemoteFailure {
        resource: String,
        operation: OperationKind,
        status: u16,
        message: String,
    },

    /// The remote may still finish the operation; re-read later.
    #[error("{resource} {operation}: not complete after {waited:?}{}", last_status_suffix(.last_status))]
    OperationTimeout {
        resource: String,
        operation: OperationKind,
        waited: Duration,
        last_status: Option<String>,
    },

    #[error("{resource} {operation}: asynchronous operation ended with status '{status}'")]
    AsyncFailed {
        resource: String,
        operation: OperationKind,
        status: String,
    },

    #[error("{resource} {operation}: field '{field}' has {} (known: {})", describe_variant(.value), .known.join(", "))]
    UnknownVariant {
        resource: String,
        operation: OperationKind,
        field: String,
        value: Option<String>,
        known: Vec<String>,
    },

    #[error("{resource} {operation}: invalid response: {message}")]
    InvalidResponse {
        resource: String,
        operation: OperationKind,
        message: String,
    },

    #[error("{resource} {operation}: transport failure after {attempts} attempt(s): {source}")]
    Transport {
        resource: String,
        operation: OperationKind,
        attempts: usize,
        #[source]
        source: HttpError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn resource(&self) -> Option<&str> {
        match self {
            EngineError::UnknownResource { resource }
            | EngineError::UnsupportedOperation { resource, .. }
            | EngineError::MissingIdentifier { resource, .. }
            | EngineError::RemoteRejected { resource, .. }
            | EngineError::RemoteFailure { resource, .. }
            | EngineError::OperationTimeout { resource, .. }
            | EngineError::AsyncFailed { resource, .. }
            | EngineError::UnknownVariant { resource, .. }
            | EngineError::InvalidResponse { resource, .. }
            | EngineError::Transport { resource, .. } => Some(resource),
            EngineError::Config(_) | EngineError::Load(_) => None,
        }
    }

    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            EngineError::UnsupportedOperation { operation, .. }
            | EngineError::MissingIdentifier { operation, .. }
            | EngineError::RemoteRejected { operation, .. }
            | EngineError::RemoteFailure { operation, .. }
            | EngineError::OperationTimeout { operation, .. }
            | EngineError::AsyncFailed { operation, .. }
            | EngineError::UnknownVariant { operation, .. }
            | EngineError::InvalidResponse { operation, .. }
            | EngineError::Transport { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// HTTP status of the response that caused the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::RemoteRejected { status, .. } | EngineError::RemoteFailure { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

fn last_status_suffix(status: &Option<String>) -> String {
    match status {
        Some(s) => format!(" (last status '{s}')"),
        None => String::new(),
    }
}

fn describe_variant(value: &Option<String>) -> String {
    match value {
        Some(v) => format!("unknown variant '{v}'"),
        None => "no discriminator value".to_string(),
    }
}

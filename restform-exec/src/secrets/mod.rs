//! Credential lookup for security schemes.

mod error;
mod provider;
mod r#ref;
mod value;

pub use error::SecretError;
pub use provider::{
    CompositeProvider, EnvSecretsProvider, FileSecretsProvider, SecretsProvider,
    StaticSecretsProvider,
};
pub use r#ref::{SecretRef, SecretRefParseError};
pub use value::SecretValue;

use std::fmt;

/// Points at a secret (`secrets://NAME`, `file-secrets://path/in/dir`).
///
/// Only the location is held here; printing it is safe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretRef {
    pub scheme: String,
    pub id: String,
}

impl SecretRef {
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, SecretRefParseError> {
        let (scheme, id) = input
            .trim()
            .split_once("://")
            .ok_or(SecretRefParseError::MissingScheme)?;
        let mut chars = scheme.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(SecretRefParseError::InvalidScheme(scheme.to_string()));
        }
        if id.is_empty() {
            return Err(SecretRefParseError::EmptyId);
        }
        Ok(Self::new(scheme, id))
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.id)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SecretRefParseError {
    #[error("secret reference must look like scheme://id")]
    MissingScheme,
    #[error("invalid secret reference scheme '{0}'")]
    InvalidScheme(String),
    #[error("secret reference id must not be empty")]
    EmptyId,
}

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::secrets::{SecretError, SecretRef, SecretValue};

/// Resolves [`SecretRef`]s into values.
///
/// A provider answers [`SecretError::NotFound`] for schemes it does not
/// handle so that providers can be chained with [`CompositeProvider`].
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError>;
}

#[derive(Default)]
pub struct CompositeProvider {
    providers: Vec<Box<dyn SecretsProvider>>,
}

impl CompositeProvider {
    pub fn new(providers: Vec<Box<dyn SecretsProvider>>) -> Self {
        Self { providers }
    }

    /// Environment variables for `secrets://` and files under `base_dir`
    /// for `file-secrets://`.
    pub fn standard(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(EnvSecretsProvider::default()),
            Box::new(FileSecretsProvider {
                scheme: "file-secrets".to_string(),
                base_dir: base_dir.into(),
            }),
        ])
    }
}

#[async_trait]
impl SecretsProvider for CompositeProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        for p in &self.providers {
            match p.get(secret_ref).await {
                Err(SecretError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(SecretError::NotFound(secret_ref.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct EnvSecretsProvider {
    pub scheme: String,
    /// Prepended to the secret id to form the variable name.
    pub env_prefix: Option<String>,
}

impl Default for EnvSecretsProvider {
    fn default() -> Self {
        Self {
            scheme: "secrets".to_string(),
            env_prefix: None,
        }
    }
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        if secret_ref.scheme != self.scheme {
            return Err(SecretError::NotFound(secret_ref.clone()));
        }
        let key = format!("{}{}", self.env_prefix.as_deref().unwrap_or(""), secret_ref.id);
        match std::env::var(&key) {
            Ok(v) => Ok(SecretValue::from_string(v)),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(secret_ref.clone())),
            Err(e) => Err(SecretError::provider(secret_ref, e.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileSecretsProvider {
    pub scheme: String,
    /// Secret ids are relative paths under this directory.
    pub base_dir: PathBuf,
}

#[async_trait]
impl SecretsProvider for FileSecretsProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        if secret_ref.scheme != self.scheme {
            return Err(SecretError::NotFound(secret_ref.clone()));
        }
        let rel = std::path::Path::new(&secret_ref.id);
        if rel.is_absolute() || rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(SecretError::provider(secret_ref, "path escapes the secrets directory"));
        }
        match tokio::fs::read(self.base_dir.join(rel)).await {
            Ok(bytes) => Ok(SecretValue::from_bytes(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SecretError::NotFound(secret_ref.clone()))
            }
            Err(e) => Err(SecretError::provider(secret_ref, e.to_string())),
        }
    }
}

/// Fixed in-memory secrets, for hosts that already hold credentials.
#[derive(Default, Clone)]
pub struct StaticSecretsProvider {
    values: BTreeMap<SecretRef, SecretValue>,
}

impl StaticSecretsProvider {
    pub fn with(mut self, secret_ref: SecretRef, value: impl Into<String>) -> Self {
        self.values
            .insert(secret_ref, SecretValue::from_string(value.into()));
        self
    }
}

#[async_trait]
impl SecretsProvider for StaticSecretsProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        self.values
            .get(secret_ref)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_ref.clone()))
    }
}

use crate::secrets::SecretRef;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(SecretRef),
    #[error("secret provider error for {secret_ref}: {message}")]
    Provider {
        secret_ref: SecretRef,
        message: String,
    },
}

impl SecretError {
    pub fn provider(secret_ref: &SecretRef, message: impl Into<String>) -> Self {
        Self::Provider {
            secret_ref: secret_ref.clone(),
            message: message.into(),
        }
    }
}

use std::sync::Arc;

use zeroize::Zeroizing;

/// Credential material. Never printed; wiped from memory when the last clone
/// is dropped.
#[derive(Clone)]
pub struct SecretValue(Arc<Zeroizing<Vec<u8>>>);

impl SecretValue {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Arc::new(Zeroizing::new(bytes)))
    }

    pub fn from_string(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }

    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// The value as text with surrounding whitespace (e.g. a trailing newline
    /// in a secret file) removed.
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(self.expose_bytes()).ok().map(str::trim)
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

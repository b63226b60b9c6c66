use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("resource key must not be empty")]
    EmptyResourceKey,
    #[error("idempotency key must not be empty")]
    EmptyIdempotencyKey,
}

/// Identifier partitioning which mutations must serialize against each other.
///
/// Whitespace-only keys are rejected: two callers that both "forgot" the key
/// would otherwise silently serialize against each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(KeyError::EmptyResourceKey)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ResourceKey {
    type Error = KeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceKey> for String {
    fn from(value: ResourceKey) -> Self {
        value.0
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied token identifying one logical (possibly retried) operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(KeyError::EmptyIdempotencyKey)
        } else {
            Ok(Self(value))
        }
    }

    /// Mint a fresh key for callers that have no natural operation id.
    ///
    /// Reuse the returned key across every retry of the same logical operation.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("op-{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for IdempotencyKey {
    type Error = KeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{IdempotencyKey, KeyError, ResourceKey};

    #[test]
    fn empty_and_blank_keys_are_rejected() {
        assert_eq!(ResourceKey::new(""), Err(KeyError::EmptyResourceKey));
        assert_eq!(ResourceKey::new("  \t"), Err(KeyError::EmptyResourceKey));
        assert_eq!(IdempotencyKey::new(""), Err(KeyError::EmptyIdempotencyKey));
    }

    #[test]
    fn keys_keep_their_original_text() {
        let key = ResourceKey::new("widget:42").unwrap();
        assert_eq!(key.as_str(), "widget:42");
        assert_eq!(key.to_string(), "widget:42");
    }

    #[test]
    fn generated_idempotency_keys_are_unique() {
        let a = IdempotencyKey::generate();
        let b = IdempotencyKey::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("op-"));
    }

    #[test]
    fn deserialization_validates() {
        let ok: ResourceKey = serde_json::from_str("\"canvas:main\"").unwrap();
        assert_eq!(ok.as_str(), "canvas:main");
        assert!(serde_json::from_str::<IdempotencyKey>("\"\"").is_err());
    }
}

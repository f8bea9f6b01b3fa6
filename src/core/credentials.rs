//! API key lookup through an external key store

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::core::errors::{ConnectorError, Result};

/// A secret value that refuses to print itself
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap a raw secret
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw secret, for building request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the stored secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// A key-store entry
#[derive(Debug, Clone)]
pub struct Key {
    /// Identifier the key is stored under
    pub id: String,
    value: SecretValue,
}

impl Key {
    /// Create a key entry
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: SecretValue::new(value),
        }
    }

    /// The secret held by this key
    pub fn key_value(&self) -> &SecretValue {
        &self.value
    }
}

/// External key store
pub trait KeyRepository: Send + Sync {
    /// Look up a key by id
    fn get_key(&self, id: &str) -> Option<Key>;
}

/// Key store backed by a map, for embedding hosts and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyRepository {
    keys: HashMap<String, Key>,
}

impl InMemoryKeyRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, replacing any entry with the same id
    pub fn with_key(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        let key = Key::new(id, value);
        self.keys.insert(key.id.clone(), key);
        self
    }
}

impl KeyRepository for InMemoryKeyRepository {
    fn get_key(&self, id: &str) -> Option<Key> {
        self.keys.get(id).cloned()
    }
}

/// Key store reading `MODERNMT_KEY_<ID>` environment variables
///
/// The id is upper-cased and every non-alphanumeric character becomes `_`,
/// so `modernmt-prod` is read from `MODERNMT_KEY_MODERNMT_PROD`.
#[derive(Debug, Clone)]
pub struct EnvKeyRepository {
    prefix: String,
}

impl EnvKeyRepository {
    /// Default variable prefix
    pub const DEFAULT_PREFIX: &'static str = "MODERNMT_KEY_";

    /// Create a store with a custom variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a key id
    pub fn variable_name(&self, id: &str) -> String {
        let suffix: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl Default for EnvKeyRepository {
    fn default() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }
}

impl KeyRepository for EnvKeyRepository {
    fn get_key(&self, id: &str) -> Option<Key> {
        std::env::var(self.variable_name(id))
            .ok()
            .map(|value| Key::new(id, value))
    }
}

/// Resolves credential ids to secrets at call time
///
/// Nothing is cached: every call goes back to the key store.
#[derive(Clone)]
pub struct CredentialResolver {
    keys: Arc<dyn KeyRepository>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}

impl CredentialResolver {
    /// Create a resolver over a key store
    pub fn new(keys: Arc<dyn KeyRepository>) -> Self {
        Self { keys }
    }

    /// Resolve a credential id to its secret
    pub fn resolve(&self, id: &str) -> Result<SecretValue> {
        if id.is_empty() {
            return Err(ConnectorError::NotConfigured);
        }

        match self.keys.get_key(id) {
            Some(key) if !key.key_value().is_empty() => {
                debug!("Resolved credential {}", id);
                Ok(key.key_value().clone())
            }
            _ => Err(ConnectorError::CredentialNotFound { id: id.to_string() }),
        }
    }
}

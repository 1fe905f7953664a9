//! Key-value storage trait definition

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Errors returned by a key-value store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing is stored under the key
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    /// The backend could not be reached or rejected the request
    #[error("transport error during {operation} of '{key}': {message}")]
    Transport {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("failed to serialize value for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes do not decode to the expected type
    #[error("failed to deserialize value at '{key}': {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub fn transport(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Generic mapping from string key to a serializable value
///
/// Implementations must be safe for concurrent use. `set` overwrites, `delete`
/// of an absent key succeeds, and `get_all` never mutates state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Stores `value` under `key`, replacing any prior value
    async fn set(&self, key: &str, value: T) -> Result<(), StorageError>;

    /// Fetches the value stored under `key`
    async fn get(&self, key: &str) -> Result<T, StorageError>;

    /// Fetches every value in the store
    async fn get_all(&self) -> Result<Vec<T>, StorageError>;

    /// Removes the value under `key`; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

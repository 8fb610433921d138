//! Session store trait

use async_trait::async_trait;

use crate::error::SessionError;

/// Trait for session storage backends
///
/// A plain key-value contract over raw bytes. Keys arrive already namespaced as
/// `{prefix}:{session_id}`; the store never interprets values.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Get the value stored under `key`
    ///
    /// Returns None if the key doesn't exist or its TTL has passed
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Store `value` under `key`, expiring after `ttl_secs` when given
    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> Result<(), SessionError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), SessionError>;

    /// Clear all keys (optional)
    async fn clear(&self) -> Result<(), SessionError> {
        Err(SessionError::StoreError("clear not implemented".to_string()))
    }

    /// Get the count of all live keys (optional)
    async fn length(&self) -> Result<usize, SessionError> {
        Err(SessionError::StoreError("length not implemented".to_string()))
    }

    /// Get all live keys starting with `prefix` (optional)
    async fn keys(&self, _prefix: &str) -> Result<Vec<String>, SessionError> {
        Err(SessionError::StoreError("keys not implemented".to_string()))
    }
}

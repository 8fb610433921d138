//! In-memory session store
//!
//! This is primarily for development and testing.
//! For production, use RedisStore or another persistent store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::SessionStore;
use crate::error::SessionError;

struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// In-memory session store
///
/// Warning: This store is not suitable for production use because:
/// - Sessions are lost on server restart
/// - Sessions are not shared across multiple server instances
/// - Memory usage grows with number of sessions
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries whose TTL has passed
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, stored| stored.is_live(now));
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|stored| stored.is_live(Instant::now()))
            .map(|stored| stored.bytes.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> Result<(), SessionError> {
        let stored = StoredValue {
            bytes: value.to_vec(),
            expires_at: ttl_secs.map(|secs| Instant::now() + Duration::from_secs(secs)),
        };
        self.entries.write().insert(key.to_string(), stored);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        self.entries.write().clear();
        Ok(())
    }

    async fn length(&self) -> Result<usize, SessionError> {
        self.cleanup_expired();
        Ok(self.entries.read().len())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, SessionError> {
        self.cleanup_expired();
        let entries = self.entries.read();
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        store.set("sessions:a", b"alice", Some(3600)).await.unwrap();
        store.set("other:b", b"bob", None).await.unwrap();

        assert_eq!(store.get("sessions:a").await.unwrap(), Some(b"alice".to_vec()));
        assert_eq!(store.length().await.unwrap(), 2);
        assert_eq!(store.keys("sessions:").await.unwrap(), vec!["sessions:a".to_string()]);

        store.delete("sessions:a").await.unwrap();
        assert!(store.get("sessions:a").await.unwrap().is_none());

        // deleting twice is fine
        store.delete("sessions:a").await.unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();

        store.set("sessions:a", b"alice", Some(0)).await.unwrap(); // Already expired

        assert!(store.get("sessions:a").await.unwrap().is_none());
        assert_eq!(store.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", b"v", None).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}

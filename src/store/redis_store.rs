//! Redis session store
//!
//! - Key: the namespaced key handed in by the middleware (`{prefix}:{session_id}`)
//! - Value: the encoded session record, stored verbatim
//! - TTL: `SET EX` when the session expires, plain `SET` otherwise

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;

use super::SessionStore;
use crate::error::SessionError;

/// Redis session store
///
/// # Example
///
/// ```rust,ignore
/// use salvo_kv_session::RedisStore;
///
/// let client = redis::Client::open("redis://127.0.0.1/")?;
/// let store = RedisStore::new(client).await?;
/// ```
pub struct RedisStore {
    conn: Arc<ConnectionManager>,
}

impl RedisStore {
    /// Create a new Redis store from a client
    pub async fn new(client: redis::Client) -> Result<Self, SessionError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection_manager(conn))
    }

    /// Create a new Redis store from a connection string
    pub async fn from_url(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)
            .map_err(|e| SessionError::StoreError(format!("Failed to create Redis client: {}", e)))?;
        Self::new(client).await
    }

    /// Create a new Redis store from an existing connection manager
    pub fn from_connection_manager(conn: ConnectionManager) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, SessionError> {
        let mut conn = (*self.conn).clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await?;
        Ok(keys)
    }
}

impl Clone for RedisStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let mut conn = (*self.conn).clone();
        let data: Option<Vec<u8>> = conn.get(key).await?;
        Ok(data)
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> Result<(), SessionError> {
        let mut conn = (*self.conn).clone();

        match ttl_secs {
            // Set with expiration (EX = seconds)
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.max(1)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        let mut conn = (*self.conn).clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        let keys = self.scan("*").await?;
        if !keys.is_empty() {
            let mut conn = (*self.conn).clone();
            conn.del::<_, ()>(keys).await?;
        }
        Ok(())
    }

    async fn length(&self) -> Result<usize, SessionError> {
        Ok(self.scan("*").await?.len())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, SessionError> {
        self.scan(&format!("{}*", prefix)).await
    }
}

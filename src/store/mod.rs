//! Session store implementations

mod memory;
mod traits;

use serde::Deserialize;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use traits::SessionStore;

#[cfg(feature = "redis-store")]
mod redis_store;

#[cfg(feature = "redis-store")]
pub use redis_store::RedisStore;

use crate::error::SessionError;

/// Storage backend selected by configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local [`MemoryStore`]
    #[default]
    Memory,
    /// [`RedisStore`] connected to `url`
    #[cfg(feature = "redis-store")]
    Redis { url: String },
}

impl StoreBackend {
    /// Build the configured store
    pub async fn connect(&self) -> Result<Arc<dyn SessionStore>, SessionError> {
        match self {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            #[cfg(feature = "redis-store")]
            StoreBackend::Redis { url } => {
                tracing::debug!("Connecting session store to {}", url);
                Ok(Arc::new(RedisStore::from_url(url).await?))
            }
        }
    }
}

//! Session error types

use std::fmt;

use salvo_core::http::{StatusCode, StatusError};
use salvo_core::prelude::*;

/// Errors that can occur during session operations
#[derive(Debug)]
pub enum SessionError {
    /// Error from the session store
    StoreError(String),
    /// Error during serialization/deserialization
    SerializationError(String),
    /// Attempt to overwrite `id` or `createdAt` through the payload API
    ReservedKey(String),
    /// Stored record failed the shape check. Absorbed by the resolver.
    Malformed(String),
    /// Redis error (when redis-store feature is enabled)
    #[cfg(feature = "redis-store")]
    RedisError(redis::RedisError),
}

impl SessionError {
    /// HTTP status used when this error ends a request
    pub fn status_code(&self) -> StatusCode {
        match self {
            #[cfg(feature = "redis-store")]
            SessionError::RedisError(e) if e.is_timeout() || e.is_connection_refusal() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap into the fatal request error handed to Salvo.
    ///
    /// The brief carries the original message and the cause carries the error itself.
    pub fn to_status_error(self) -> StatusError {
        let brief = self.to_string();
        StatusError::from_code(self.status_code())
            .unwrap_or_else(StatusError::internal_server_error)
            .brief(brief)
            .cause(self)
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::StoreError(msg) => write!(f, "Session store error: {}", msg),
            SessionError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::ReservedKey(key) => write!(f, "Reserved session key: {}", key),
            SessionError::Malformed(msg) => write!(f, "Malformed session record: {}", msg),
            #[cfg(feature = "redis-store")]
            SessionError::RedisError(e) => write!(f, "Redis error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "redis-store")]
            SessionError::RedisError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::RedisError(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationError(err.to_string())
    }
}

#[async_trait]
impl Writer for SessionError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        tracing::error!("Session operation failed: {}", self);
        res.render(self.to_status_error());
    }
}

//! Loading the session named by the request cookie

use chrono::Utc;
use std::sync::Arc;

use crate::codec;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::SessionData;
use crate::store::SessionStore;

/// Outcome of looking up the request's session
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A valid, unexpired session
    Found(SessionData),
    /// No cookie, no record, or a record that failed the shape check
    Absent,
    /// The record had expired; it has been deleted and the cookie should go too
    Expired,
}

/// Resolves cookie values to stored sessions
pub struct SessionResolver {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn SessionStore>, config: Arc<SessionConfig>) -> Self {
        Self { store, config }
    }

    /// Look up the session for a raw cookie value.
    ///
    /// Expired records are deleted before returning. Only store failures are errors.
    pub async fn resolve(&self, cookie_value: Option<&str>) -> Result<Resolution, SessionError> {
        let Some(raw) = cookie_value else {
            return Ok(Resolution::Absent);
        };

        // URL decode the value (cookies may be URL encoded)
        let sid = match urlencoding::decode(raw) {
            Ok(d) => d.into_owned(),
            Err(_) => raw.to_string(),
        };
        if sid.is_empty() {
            return Ok(Resolution::Absent);
        }

        let key = self.config.store_key(&sid);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(Resolution::Absent);
        };

        let data = match codec::decode(&bytes).and_then(|data| check_id(data, &sid)) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Ignoring stored session {}: {}", sid, e);
                return Ok(Resolution::Absent);
            }
        };

        if data.is_expired(self.config.expiry, Utc::now()) {
            tracing::debug!("Session {} expired, removing", sid);
            self.store.delete(&key).await?;
            return Ok(Resolution::Expired);
        }

        Ok(Resolution::Found(data))
    }
}

fn check_id(data: SessionData, sid: &str) -> Result<SessionData, SessionError> {
    if data.id == sid {
        Ok(data)
    } else {
        Err(SessionError::Malformed(format!("record id {} does not match", data.id)))
    }
}

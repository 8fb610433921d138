//! Session data and the handler-facing session handle

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::codec;
use crate::config::{Expiry, SessionConfig};
use crate::error::SessionError;
use crate::lifecycle::{CookieAction, SessionContext, SessionMode};
use crate::resolver::Resolution;
use crate::store::SessionStore;

/// Keys owned by the lifecycle bookkeeping, never writable through the payload API
pub const RESERVED_KEYS: [&str; 2] = ["id", "createdAt"];

/// A session record as it lives in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session ID, empty while no session has been issued
    pub id: String,

    /// Creation marker and expiry anchor, reset whenever the cookie is re-issued
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Handler data (flattened at same level as id and createdAt)
    #[serde(flatten)]
    pub data: BTreeMap<String, Value>,
}

impl SessionData {
    /// Create empty session data with the given ID and creation time
    pub fn new(id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            data: BTreeMap::new(),
        }
    }

    /// Fresh session with a new ID, stamped now, seeded with a copy of `payload`
    pub fn create(id_length: usize, payload: BTreeMap<String, Value>) -> Self {
        Self {
            id: generate_id(id_length),
            created_at: Utc::now(),
            data: payload,
        }
    }

    /// Get a value from session data
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in session data
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), SessionError> {
        if RESERVED_KEYS.contains(&key) {
            return Err(SessionError::ReservedKey(key.to_string()));
        }
        let value = serde_json::to_value(value)?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    /// Remove a value from session data
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Clear all handler data, keeping id and createdAt
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Check if session data is empty (no user data)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether more than the configured expiry has elapsed since `created_at`
    pub fn is_expired(&self, expiry: Expiry, now: DateTime<Utc>) -> bool {
        match expiry.as_secs() {
            Some(secs) => {
                let elapsed = (now - self.created_at).num_seconds();
                elapsed > 0 && elapsed as u64 > secs
            }
            None => false,
        }
    }

    /// Seconds the store should keep this record, `None` for no TTL.
    ///
    /// One second past the expiry boundary, so the record is still readable when
    /// the resolver first sees it expired and can clear the cookie.
    pub fn remaining_ttl(&self, expiry: Expiry, now: DateTime<Utc>) -> Option<u64> {
        expiry.as_secs().map(|secs| {
            let elapsed = (now - self.created_at).num_seconds().max(0) as u64;
            secs.saturating_sub(elapsed).saturating_add(1)
        })
    }
}

/// Generate a random hex session ID of the requested length
pub fn generate_id(len: usize) -> String {
    let mut id = String::with_capacity(len + 32);
    while id.len() < len {
        id.push_str(&Uuid::new_v4().simple().to_string());
    }
    id.truncate(len);
    id
}

/// Request-scoped session handle
///
/// Cloning is cheap; clones share the same request context. Handlers get one
/// through [`SessionDepotExt`](crate::SessionDepotExt).
pub struct Session {
    ctx: Arc<RwLock<SessionContext>>,
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl Session {
    /// Seed the request context from what the resolver found
    pub(crate) fn seed(
        resolution: Resolution,
        store: Arc<dyn SessionStore>,
        config: Arc<SessionConfig>,
    ) -> Result<Self, SessionError> {
        let ctx = SessionContext::new(resolution, Utc::now())?;
        Ok(Self {
            ctx: Arc::new(RwLock::new(ctx)),
            store,
            config,
        })
    }

    /// Get the session ID, empty when no session has been issued yet
    pub fn id(&self) -> String {
        self.ctx.read().record().id.clone()
    }

    /// Creation time of the current session
    pub fn created_at(&self) -> DateTime<Utc> {
        self.ctx.read().record().created_at
    }

    /// Check if the request arrived without a live session
    pub fn is_new(&self) -> bool {
        self.ctx.read().mode() == SessionMode::Init
    }

    /// Check if the session was destroyed during this request
    pub fn is_destroyed(&self) -> bool {
        self.ctx.read().is_destroyed()
    }

    /// Get a value from the session
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.ctx.read().record().get(key)
    }

    /// Set a value in the session
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        self.ctx.write().record_mut().set(key, value)
    }

    /// Remove a value from the session
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.ctx.write().record_mut().remove(key)
    }

    /// Check if a key exists in the session
    pub fn contains(&self, key: &str) -> bool {
        self.ctx.read().record().contains(key)
    }

    /// Clear all session data
    pub fn clear(&self) {
        self.ctx.write().record_mut().clear();
    }

    /// Check if the session is empty (no user data)
    pub fn is_empty(&self) -> bool {
        self.ctx.read().record().is_empty()
    }

    /// Get a copy of the session data
    pub fn data(&self) -> SessionData {
        self.ctx.read().record().clone()
    }

    /// Treat the session as modified: re-issue the cookie and save it even if
    /// nothing changed
    pub fn touch(&self) {
        self.ctx.write().touch();
    }

    /// Delete the stored record now and clear the cookie.
    ///
    /// Later changes to the session during this request are not saved.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        let sid = self.id();
        if !sid.is_empty() {
            self.store.delete(&self.config.store_key(&sid)).await?;
            tracing::debug!("Destroyed session {}", sid);
        }
        self.ctx.write().mark_destroyed();
        Ok(())
    }

    /// Replace the session with a new ID, keeping its current data
    pub async fn regenerate(&self) -> Result<(), SessionError> {
        let payload = self.ctx.read().record().data.clone();
        self.destroy().await?;

        let fresh = SessionData::create(self.config.id_length, payload);
        tracing::debug!("Regenerated session as {}", fresh.id);
        self.ctx.write().renew(fresh);
        Ok(())
    }

    /// Header-emission decision: what to do with the cookie
    pub(crate) fn commit_headers(&self) -> Result<CookieAction, SessionError> {
        self.ctx.write().on_headers(&self.config, Utc::now())
    }

    /// Body-completion decision: write the record if it changed
    pub(crate) async fn persist(&self) -> Result<(), SessionError> {
        let pending = self.ctx.write().on_finish()?;
        let Some(record) = pending else {
            return Ok(());
        };

        let bytes = codec::encode(&record)?;
        let ttl = record.remaining_ttl(self.config.expiry, Utc::now());
        self.store
            .set(&self.config.store_key(&record.id), &bytes, ttl)
            .await?;
        tracing::debug!("Saved session {}", record.id);
        Ok(())
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ctx = self.ctx.read();
        f.debug_struct("Session")
            .field("data", ctx.record())
            .field("mode", &ctx.mode())
            .field("destroyed", &ctx.is_destroyed())
            .finish()
    }
}

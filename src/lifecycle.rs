//! Per-request session state machine
//!
//! A [`SessionContext`] is created when the request arrives and observed twice:
//! once when response headers are committed ([`SessionContext::on_headers`], which
//! decides the cookie) and once when the response is complete
//! ([`SessionContext::on_finish`], which decides the store write). Both compare the
//! session against the snapshot taken before the handler ran.

use chrono::{DateTime, Utc};

use crate::codec;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::resolver::Resolution;
use crate::session::{generate_id, SessionData};

/// How the request started
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// No live session came with the request
    Init,
    /// A valid session was loaded from the store
    Active,
}

/// What the cookie writer should do when headers are committed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CookieAction {
    /// Leave the client's cookie alone
    Keep,
    /// (Re)issue the cookie for this session
    Write {
        id: String,
        created_at: DateTime<Utc>,
    },
    /// Remove the cookie from the client
    Clear,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    id: String,
    fingerprint: String,
}

pub(crate) struct SessionContext {
    mode: SessionMode,
    record: SessionData,
    touched: bool,
    renewed: bool,
    destroyed: bool,
    clear_cookie: bool,
    before: Snapshot,
    at_headers: Option<Snapshot>,
    headers_done: bool,
    finished: bool,
}

impl SessionContext {
    pub(crate) fn new(resolution: Resolution, now: DateTime<Utc>) -> Result<Self, SessionError> {
        let (mode, record, clear_cookie) = match resolution {
            Resolution::Found(data) => (SessionMode::Active, data, false),
            Resolution::Absent => (SessionMode::Init, SessionData::new(String::new(), now), false),
            // the stale cookie goes away unless a new session replaces it
            Resolution::Expired => (SessionMode::Init, SessionData::new(String::new(), now), true),
        };
        let before = snapshot(&record)?;

        Ok(Self {
            mode,
            record,
            touched: false,
            renewed: false,
            destroyed: false,
            clear_cookie,
            before,
            at_headers: None,
            headers_done: false,
            finished: false,
        })
    }

    pub(crate) fn mode(&self) -> SessionMode {
        self.mode
    }

    pub(crate) fn record(&self) -> &SessionData {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut SessionData {
        &mut self.record
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn touch(&mut self) {
        self.touched = true;
    }

    /// The store record is already gone; forget the session and drop the cookie
    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
        self.clear_cookie = true;
        self.touched = false;
        self.renewed = false;
        self.record.id.clear();
        self.record.data.clear();
    }

    pub(crate) fn renew(&mut self, fresh: SessionData) {
        self.record = fresh;
        self.destroyed = false;
        self.renewed = true;
    }

    fn changed(&self, current: &Snapshot) -> bool {
        *current != self.before || self.touched
    }

    /// Runs once, before headers are sent
    pub(crate) fn on_headers(
        &mut self,
        config: &SessionConfig,
        now: DateTime<Utc>,
    ) -> Result<CookieAction, SessionError> {
        if self.headers_done {
            return Ok(CookieAction::Keep);
        }
        self.headers_done = true;

        if self.destroyed {
            return Ok(if self.clear_cookie {
                CookieAction::Clear
            } else {
                CookieAction::Keep
            });
        }

        let current = snapshot(&self.record)?;
        let changed = self.changed(&current);
        let issue = match self.mode {
            SessionMode::Init => changed,
            SessionMode::Active => {
                config.rolling || (changed && (config.expiry.is_finite() || self.renewed))
            }
        };

        let action = if issue {
            if self.record.id.is_empty() {
                self.record.id = generate_id(config.id_length);
                tracing::debug!("Created session {}", self.record.id);
            }
            self.record.created_at = now;
            CookieAction::Write {
                id: self.record.id.clone(),
                created_at: now,
            }
        } else if self.clear_cookie {
            CookieAction::Clear
        } else {
            CookieAction::Keep
        };

        self.at_headers = Some(snapshot(&self.record)?);
        Ok(action)
    }

    /// Runs once, after the response body; returns the record to save, if any
    pub(crate) fn on_finish(&mut self) -> Result<Option<SessionData>, SessionError> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;

        if self.destroyed || self.record.id.is_empty() {
            return Ok(None);
        }

        let current = snapshot(&self.record)?;
        if let Some(committed) = &self.at_headers {
            if *committed != current {
                tracing::debug!(
                    "Session {} changed after headers were committed",
                    self.record.id
                );
            }
        }

        if self.changed(&current) {
            Ok(Some(self.record.clone()))
        } else {
            Ok(None)
        }
    }
}

fn snapshot(record: &SessionData) -> Result<Snapshot, SessionError> {
    Ok(Snapshot {
        id: record.id.clone(),
        fingerprint: codec::fingerprint(record)?,
    })
}

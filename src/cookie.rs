//! Session cookie construction

use chrono::{DateTime, Utc};
use salvo_core::http::cookie::time::OffsetDateTime;
use salvo_core::http::cookie::{self, Cookie};
use salvo_core::http::Response;
use std::sync::Arc;

use crate::config::{SameSite, SessionConfig};
use crate::lifecycle::CookieAction;

/// Writes and clears the session cookie using the configured attributes
pub struct CookieWriter {
    config: Arc<SessionConfig>,
}

impl CookieWriter {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self { config }
    }

    /// Cookie carrying `sid`, expiring `expiry` seconds after `created_at`.
    /// Infinite expiry gives a browser-session cookie.
    pub fn build(&self, sid: &str, created_at: DateTime<Utc>) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.cookie_name.clone(), sid.to_string()))
            .path(self.config.cookie_path.clone())
            .http_only(self.config.cookie_http_only)
            .secure(self.config.cookie_secure)
            .same_site(match self.config.cookie_same_site {
                SameSite::Strict => cookie::SameSite::Strict,
                SameSite::Lax => cookie::SameSite::Lax,
                SameSite::None => cookie::SameSite::None,
            });

        if let Some(domain) = self.config.cookie_domain.clone() {
            builder = builder.domain(domain);
        }

        if let Some(secs) = self.config.expiry.as_secs() {
            let secs = i64::try_from(secs).unwrap_or(i64::MAX);
            let at = created_at.timestamp().saturating_add(secs);
            match OffsetDateTime::from_unix_timestamp(at) {
                Ok(expires) => builder = builder.expires(expires),
                Err(_) => tracing::warn!("Cookie expiry out of range, sending a session cookie"),
            }
        }

        builder.build()
    }

    /// Cookie instructing the client to drop the session cookie
    pub fn removal(&self) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.cookie_name.clone(), String::new()))
            .path(self.config.cookie_path.clone());
        if let Some(domain) = self.config.cookie_domain.clone() {
            builder = builder.domain(domain);
        }
        let mut cookie = builder.build();
        cookie.make_removal();
        cookie
    }

    /// Set session cookie on response
    pub fn write(&self, res: &mut Response, sid: &str, created_at: DateTime<Utc>) {
        res.add_cookie(self.build(sid, created_at));
    }

    /// Remove session cookie
    pub fn clear(&self, res: &mut Response) {
        res.add_cookie(self.removal());
    }

    pub(crate) fn apply(&self, res: &mut Response, action: CookieAction) {
        match action {
            CookieAction::Keep => {}
            CookieAction::Write { id, created_at } => self.write(res, &id, created_at),
            CookieAction::Clear => self.clear(res),
        }
    }
}

//! Session configuration

use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::store::StoreBackend;

/// Configuration for the session middleware
///
/// Built once at startup and handed to [`SessionHandler`](crate::SessionHandler);
/// every request reads the same immutable copy.
///
/// Deserializes from either the snake_case field names or the camelCase keys
/// (`expiryInSeconds`, `idLength`, `cookieName`, `domain`, ...). Unknown keys are
/// rejected.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How long a session lives after it was last (re)issued (default: 600 seconds)
    #[serde(alias = "expiryInSeconds")]
    pub expiry: Expiry,

    /// Length of generated session IDs (default: 64, never below [`MIN_ID_LENGTH`])
    #[serde(alias = "idLength", deserialize_with = "deserialize_id_length")]
    pub id_length: usize,

    /// Namespace for store keys, joined as `{prefix}:{id}` (default: "sessions")
    #[serde(alias = "storePrefix")]
    pub store_prefix: String,

    /// Name of the session cookie (default: "sessionId")
    #[serde(alias = "cookieName")]
    pub cookie_name: String,

    /// Cookie path (default: "/")
    #[serde(alias = "cookiePath")]
    pub cookie_path: String,

    /// Cookie domain (default: None - current domain only). `false` also means none.
    #[serde(alias = "domain", deserialize_with = "deserialize_domain")]
    pub cookie_domain: Option<String>,

    /// HttpOnly flag for cookie (default: true)
    #[serde(alias = "cookieHttpOnly")]
    pub cookie_http_only: bool,

    /// Secure flag for cookie (default: true)
    #[serde(alias = "cookieSecure")]
    pub cookie_secure: bool,

    /// SameSite attribute for cookie
    #[serde(alias = "cookieSameSite")]
    pub cookie_same_site: SameSite,

    /// Whether to reset cookie expiry on every request (default: false)
    pub rolling: bool,

    /// Accepted for compatibility, currently has no effect
    pub resave: bool,

    /// Accepted for compatibility, currently has no effect
    #[serde(alias = "saveUninitialized")]
    pub save_uninitialized: bool,

    /// Storage backend used by [`SessionHandler::connect`](crate::SessionHandler::connect)
    pub store: StoreBackend,

    /// Spawn the end-of-request store write instead of awaiting it (default: false)
    #[serde(alias = "backgroundPersist")]
    pub background_persist: bool,
}

/// Shortest session ID the middleware will generate
pub const MIN_ID_LENGTH: usize = 16;

fn deserialize_id_length<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    usize::deserialize(deserializer).map(|len| len.max(MIN_ID_LENGTH))
}

fn deserialize_domain<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Domain {
        Flag(bool),
        Name(String),
    }

    match Option::<Domain>::deserialize(deserializer)? {
        None | Some(Domain::Flag(false)) => Ok(None),
        Some(Domain::Flag(true)) => Err(de::Error::invalid_value(
            de::Unexpected::Bool(true),
            &"a domain name, false or null",
        )),
        Some(Domain::Name(name)) => Ok(Some(name)),
    }
}

/// SameSite cookie attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Strict - cookie only sent for same-site requests
    Strict,
    /// Lax - cookie sent for same-site requests and top-level navigations
    Lax,
    /// None - cookie sent for all requests (requires Secure)
    None,
}

/// Session lifetime, anchored on the session's `createdAt`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    /// Expires this many seconds after `createdAt`
    Seconds(u64),
    /// Never expires; the cookie lives for the browser session
    Infinite,
}

impl Expiry {
    pub fn is_finite(&self) -> bool {
        matches!(self, Expiry::Seconds(_))
    }

    pub fn as_secs(&self) -> Option<u64> {
        match self {
            Expiry::Seconds(secs) => Some(*secs),
            Expiry::Infinite => None,
        }
    }
}

impl From<u64> for Expiry {
    fn from(secs: u64) -> Self {
        Expiry::Seconds(secs)
    }
}

impl From<Option<u64>> for Expiry {
    fn from(secs: Option<u64>) -> Self {
        secs.map_or(Expiry::Infinite, Expiry::Seconds)
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExpiryVisitor;

        impl<'de> Visitor<'de> for ExpiryVisitor {
            type Value = Expiry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number of seconds or \"infinite\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Expiry, E> {
                Ok(Expiry::Seconds(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Expiry, E> {
                u64::try_from(v)
                    .map(Expiry::Seconds)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Expiry, E> {
                if v.eq_ignore_ascii_case("infinite") {
                    Ok(Expiry::Infinite)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(ExpiryVisitor)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry: Expiry::Seconds(600),
            id_length: 64,
            store_prefix: "sessions".to_string(),
            cookie_name: "sessionId".to_string(),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_http_only: true,
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            rolling: false,
            resave: false,
            save_uninitialized: false,
            store: StoreBackend::Memory,
            background_persist: false,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session expiry: seconds, an [`Expiry`], or `Option<u64>` where
    /// `None` means the session never expires
    pub fn with_expiry(mut self, expiry: impl Into<Expiry>) -> Self {
        self.expiry = expiry.into();
        self
    }

    /// Set the session expiry from a Duration
    pub fn with_expiry_duration(mut self, duration: impl Into<Option<Duration>>) -> Self {
        self.expiry = duration.into().map(|d| d.as_secs()).into();
        self
    }

    /// Set the generated ID length (default: 64, minimum 16)
    pub fn with_id_length(mut self, len: usize) -> Self {
        self.id_length = len.max(MIN_ID_LENGTH);
        self
    }

    /// Set the store key prefix (default: "sessions")
    pub fn with_store_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.store_prefix = prefix.into();
        self
    }

    /// Set the cookie name (default: "sessionId")
    pub fn with_cookie_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the cookie path (default: "/")
    pub fn with_cookie_path<S: Into<String>>(mut self, path: S) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_cookie_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    /// Set the Secure flag (default: true)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set the SameSite attribute (default: Lax)
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    /// Set whether to reset cookie expiry on every request (default: false)
    pub fn with_rolling(mut self, rolling: bool) -> Self {
        self.rolling = rolling;
        self
    }

    /// Accepted but inert
    pub fn with_resave(mut self, resave: bool) -> Self {
        self.resave = resave;
        self
    }

    /// Accepted but inert
    pub fn with_save_uninitialized(mut self, save: bool) -> Self {
        self.save_uninitialized = save;
        self
    }

    /// Select the storage backend
    pub fn with_store(mut self, store: StoreBackend) -> Self {
        self.store = store;
        self
    }

    /// Persist in a spawned task once the response is handed back to Salvo.
    /// Failures are logged only and the write happens at most once.
    pub fn with_background_persist(mut self, background: bool) -> Self {
        self.background_persist = background;
        self
    }

    /// Get expiry as Duration
    pub fn expiry_duration(&self) -> Option<Duration> {
        self.expiry.as_secs().map(Duration::from_secs)
    }

    /// Namespaced store key for a session ID
    pub fn store_key(&self, sid: &str) -> String {
        format!("{}:{}", self.store_prefix, sid)
    }
}

//! # salvo-kv-session
//!
//! Server-side session middleware for the Salvo web framework.
//!
//! A random session ID travels in a cookie; the session data lives in a pluggable
//! key-value store under `{prefix}:{id}`. Per request the middleware decides whether
//! the session is new, unchanged, modified, touched, regenerated or destroyed, and
//! from that whether to (re)issue the cookie and whether to write the store.
//!
//! ## Features
//!
//! - **Change detection**: content fingerprints, so an unmodified session is never rewritten
//! - **At most one store write per request**, no matter how often the handler mutates
//! - **Eager expiry**: expired sessions are deleted the first time they are looked up
//! - **Rolling sessions**: optionally refresh expiry on every request
//! - **Pluggable storage backends**: Redis, Memory, or custom stores
//! - **Full session lifecycle**: create, read, update, touch, regenerate and destroy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salvo::prelude::*;
//! use salvo_kv_session::{MemoryStore, SessionConfig, SessionDepotExt, SessionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session_config = SessionConfig::new()
//!         .with_cookie_name("sessionId")
//!         .with_expiry(3600);
//!
//!     let session_handler = SessionHandler::new(MemoryStore::new(), session_config);
//!
//!     let router = Router::new()
//!         .hoop(session_handler)
//!         .get(index);
//!
//!     let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
//!     Server::new(acceptor).serve(router).await;
//! }
//!
//! #[handler]
//! async fn index(depot: &mut Depot) -> Result<&'static str, salvo_kv_session::SessionError> {
//!     let session = depot.session().unwrap();
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1)?;
//!     Ok("Hello, World!")
//! }
//! ```
//!
//! ## Concurrency
//!
//! Each request owns its session context. Two concurrent requests carrying the same
//! session ID are not coordinated: whichever saves last wins.

pub mod codec;
pub mod config;
pub mod cookie;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod resolver;
pub mod session;
pub mod store;

pub use config::{Expiry, SameSite, SessionConfig};
pub use cookie::CookieWriter;
pub use error::SessionError;
pub use handler::SessionHandler;
pub use lifecycle::{CookieAction, SessionMode};
pub use resolver::{Resolution, SessionResolver};
pub use session::{Session, SessionData};
pub use store::{MemoryStore, SessionStore, StoreBackend};

#[cfg(feature = "redis-store")]
pub use store::RedisStore;

/// Extension trait for Depot to easily access session
pub mod depot_ext;
pub use depot_ext::SessionDepotExt;

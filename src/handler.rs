//! Session middleware handler for Salvo

use salvo_core::prelude::*;
use std::sync::Arc;

use crate::config::{SessionConfig, MIN_ID_LENGTH};
use crate::cookie::CookieWriter;
use crate::error::SessionError;
use crate::resolver::SessionResolver;
use crate::session::Session;
use crate::store::SessionStore;

pub(crate) const SESSION_KEY: &str = "salvo.kv.session";

/// Session middleware for Salvo
///
/// Resolves the session named by the request cookie before the rest of the chain
/// runs, then decides the cookie and the store write once the chain returns:
///
/// 1. header emission: (re)issue or clear the cookie
/// 2. body completion: save the record if it changed, at most once per request
pub struct SessionHandler {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
    resolver: Arc<SessionResolver>,
    cookies: Arc<CookieWriter>,
}

impl SessionHandler {
    /// Create a new session handler
    pub fn new<S: SessionStore>(store: S, config: SessionConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a handler over an already shared store
    pub fn from_shared(store: Arc<dyn SessionStore>, mut config: SessionConfig) -> Self {
        config.id_length = config.id_length.max(MIN_ID_LENGTH);
        let config = Arc::new(config);
        Self {
            resolver: Arc::new(SessionResolver::new(Arc::clone(&store), Arc::clone(&config))),
            cookies: Arc::new(CookieWriter::new(Arc::clone(&config))),
            store,
            config,
        }
    }

    /// Create a handler over the backend named in `config.store`
    pub async fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        let store = config.store.connect().await?;
        Ok(Self::from_shared(store, config))
    }

    /// The store sessions are persisted to
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn fail(&self, res: &mut Response, err: SessionError) {
        tracing::error!("Session lifecycle failed: {}", err);
        res.render(err.to_status_error());
    }
}

impl Clone for SessionHandler {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
            cookies: Arc::clone(&self.cookies),
        }
    }
}

#[async_trait]
impl Handler for SessionHandler {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        let cookie_value = req
            .cookie(&self.config.cookie_name)
            .map(|c| c.value().to_string());

        let seeded = match self.resolver.resolve(cookie_value.as_deref()).await {
            Ok(resolution) => Session::seed(resolution, Arc::clone(&self.store), Arc::clone(&self.config)),
            Err(e) => Err(e),
        };
        let session = match seeded {
            Ok(session) => session,
            Err(e) => {
                self.fail(res, e);
                ctrl.skip_rest();
                return;
            }
        };

        // Store session in depot
        depot.insert(SESSION_KEY, session.clone());

        // Continue with the request
        ctrl.call_next(req, depot, res).await;

        // Salvo writes Set-Cookie only after every hoop returns, so this is
        // still ahead of the headers
        let action = match session.commit_headers() {
            Ok(action) => action,
            Err(e) => return self.fail(res, e),
        };

        if self.config.background_persist {
            self.cookies.apply(res, action);
            tokio::spawn(async move {
                if let Err(e) = session.persist().await {
                    tracing::error!("Failed to save session in background: {}", e);
                }
            });
            return;
        }

        // a cookie for a record that never reached the store must not go out
        match session.persist().await {
            Ok(()) => self.cookies.apply(res, action),
            Err(e) => self.fail(res, e),
        }
    }
}

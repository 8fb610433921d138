//! Extension trait for Depot to easily access sessions

use salvo_core::Depot;

use crate::handler::SESSION_KEY;
use crate::session::Session;

/// Extension trait for Salvo's Depot to provide easy session access
pub trait SessionDepotExt {
    /// Get a reference to the session
    fn session(&self) -> Option<&Session>;

    /// Get an owned session handle (a clone with shared state)
    fn session_mut(&mut self) -> Option<Session>;
}

impl SessionDepotExt for Depot {
    fn session(&self) -> Option<&Session> {
        self.get::<Session>(SESSION_KEY).ok()
    }

    fn session_mut(&mut self) -> Option<Session> {
        self.get::<Session>(SESSION_KEY).ok().cloned()
    }
}

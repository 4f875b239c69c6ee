//! Shared application state

use std::sync::Arc;

use crate::auth::{JwtSessionResolver, SessionResolver};
use crate::config::Config;
use crate::routing::HostRouter;
use crate::stats::StatsProvider;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub host_router: Arc<HostRouter>,
    pub stats: Arc<dyn StatsProvider>,
    pub sessions: Arc<dyn SessionResolver>,
}

impl AppState {
    pub fn new(config: Config, stats: Arc<dyn StatsProvider>) -> Self {
        let host_router = Arc::new(HostRouter::from_config(&config));
        let sessions = Arc::new(JwtSessionResolver::new(config.session_jwt_secret.as_deref()));

        Self {
            config: Arc::new(config),
            host_router,
            stats,
            sessions,
        }
    }

    /// Replace the session resolver
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.sessions = sessions;
        self
    }
}

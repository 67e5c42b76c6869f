//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use diag_assist_config::Settings;
use diag_assist_core::ContentCatalog;

use crate::session::SessionManager;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Immutable content shared by every session
    pub catalog: Arc<ContentCatalog>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(config: Settings, catalog: ContentCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let sessions = SessionManager::new(
            Arc::clone(&catalog),
            config.timing.clone(),
            config.flow.clone(),
            config.server.max_sessions,
        )
        .with_expiry(
            config.server.session_idle_timeout(),
            config.server.cleanup_interval(),
        );

        Self {
            config: Arc::new(config),
            catalog,
            sessions: Arc::new(sessions),
        }
    }
}

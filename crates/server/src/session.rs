//! Session Management
//!
//! In-memory registry of diagnostic chat sessions with idle expiry.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use diag_assist_agent::ChatSession;
use diag_assist_config::constants::sessions;
use diag_assist_config::{FlowConfig, TimingConfig};
use diag_assist_core::ContentCatalog;

use crate::ServerError;

/// A hosted chat session
pub struct Session {
    pub id: String,
    pub chat: ChatSession,
    pub created_at: chrono::DateTime<chrono::Utc>,
    last_activity: RwLock<Instant>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        catalog: Arc<ContentCatalog>,
        timing: TimingConfig,
        flow: FlowConfig,
    ) -> Self {
        let id = id.into();
        Self {
            chat: ChatSession::new(id.clone(), catalog, timing, flow),
            id,
            created_at: chrono::Utc::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.idle_for() > timeout
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    catalog: Arc<ContentCatalog>,
    timing: TimingConfig,
    flow: FlowConfig,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(
        catalog: Arc<ContentCatalog>,
        timing: TimingConfig,
        flow: FlowConfig,
        max_sessions: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            catalog,
            timing,
            flow,
            max_sessions,
            session_timeout: Duration::from_secs(sessions::IDLE_TIMEOUT_SECS),
            cleanup_interval: Duration::from_secs(sessions::CLEANUP_INTERVAL_SECS),
        }
    }

    pub fn with_expiry(mut self, session_timeout: Duration, cleanup_interval: Duration) -> Self {
        self.session_timeout = session_timeout;
        self.cleanup_interval = cleanup_interval;
        self
    }

    /// Start a background task that removes idle sessions.
    ///
    /// Send `true` on the returned channel to stop it.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Session cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a new session at the start screen
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);
            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Capacity(self.max_sessions));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(
            &id,
            Arc::clone(&self.catalog),
            self.timing.clone(),
            self.flow.clone(),
        ));
        sessions.insert(id.clone(), Arc::clone(&session));

        tracing::info!(session_id = %id, active = sessions.len(), "Created session");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Look up a session and mark it active
    pub fn touch(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        let session = self
            .get(id)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Remove a session, returning whether it existed
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed.is_some()
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop idle sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            tracing::info!(session_id = %id, "Expired session");
        }
        expired.len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag_assist_config::parse_catalog;

    fn manager(max_sessions: usize) -> SessionManager {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/catalogs/rtv_xg850_overheating.yaml"
        );
        let catalog = parse_catalog(&std::fs::read_to_string(path).unwrap()).unwrap();
        SessionManager::new(
            Arc::new(catalog),
            TimingConfig::immediate(),
            FlowConfig::default(),
            max_sessions,
        )
    }

    #[test]
    fn test_session_get_and_remove() {
        let manager = manager(10);
        let session = manager.create().unwrap();
        let id = session.id.clone();

        assert_eq!(manager.get(&id).map(|s| s.id.clone()), Some(id.clone()));
        assert!(manager.remove(&id));
        assert!(manager.get(&id).is_none());
        assert!(!manager.remove(&id));
    }

    #[test]
    fn test_capacity() {
        let manager = manager(1);
        manager.create().unwrap();
        assert!(matches!(manager.create(), Err(ServerError::Capacity(1))));
    }

    #[test]
    fn test_expired_sessions_make_room() {
        let manager = manager(1).with_expiry(Duration::ZERO, Duration::from_secs(60));
        let first = manager.create().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = manager.create().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_touch_unknown() {
        let manager = manager(1);
        assert!(matches!(
            manager.touch("missing"),
            Err(ServerError::SessionNotFound(_))
        ));
    }
}

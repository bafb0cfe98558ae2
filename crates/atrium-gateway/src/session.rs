//! Gateway session management.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tracks all active gateway sessions.
pub struct SessionManager {
    /// Map of session_id → Session
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Map of user_id → Vec<session_id> (a user can have multiple tabs/devices)
    user_sessions: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub connected_at: chrono::DateTime<chrono::Utc>,
    /// Last heartbeat time
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            user_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new session once the client has identified.
    pub async fn register(&self, session_id: String, user_id: String) {
        let now = chrono::Utc::now();
        let session = Session {
            session_id: session_id.clone(),
            user_id: user_id.clone(),
            connected_at: now,
            last_heartbeat: now,
        };

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session);

        self.user_sessions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(session_id);
    }

    /// Remove a session.
    pub async fn remove(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.remove(session_id) {
            if let Some(sessions) = self.user_sessions.write().await.get_mut(&session.user_id) {
                sessions.retain(|s| s != session_id);
            }
        }
    }

    /// Record a heartbeat for a session.
    pub async fn heartbeat(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.last_heartbeat = chrono::Utc::now();
        }
    }

    /// Check if a user is online (has at least one active session).
    pub async fn is_online(&self, user_id: &str) -> bool {
        self.user_sessions
            .read()
            .await
            .get(user_id)
            .is_some_and(|sessions| !sessions.is_empty())
    }

    /// Get total active sessions count.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

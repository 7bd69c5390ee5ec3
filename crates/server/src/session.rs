//! Session Management
//!
//! Each session owns the accumulated [`SessionContext`] and its chat history.
//! The context sits behind an async mutex so turns on one session run one at
//! a time while different sessions proceed concurrently.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

use stylist_config::constants::session::HISTORY_CAPACITY;
use stylist_core::{SearchFilters, SessionContext};

use crate::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One history entry
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_ids: Vec<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            recommended_ids: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>, recommended_ids: Vec<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            recommended_ids,
        }
    }
}

/// Snapshot served by the session info endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub idle_secs: u64,
    pub turn_count: u32,
    pub messages: usize,
    pub filters: SearchFilters,
    pub preferences: serde_json::Value,
    pub seen_products: usize,
    pub feedback_events: usize,
}

/// Session state
#[derive(Debug)]
pub struct Session {
    /// Session ID
    pub id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last activity
    last_activity: RwLock<Instant>,
    /// Is active
    active: RwLock<bool>,
    context: Mutex<SessionContext>,
    history: RwLock<Vec<ChatMessage>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            last_activity: RwLock::new(Instant::now()),
            active: RwLock::new(true),
            context: Mutex::new(SessionContext::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Exclusive access to the accumulated context for one turn
    pub async fn lock_context(&self) -> tokio::sync::MutexGuard<'_, SessionContext> {
        self.context.lock().await
    }

    /// Append a completed exchange, keeping the most recent messages
    pub fn record_exchange(&self, user: ChatMessage, assistant: ChatMessage) {
        let mut history = self.history.write();
        history.push(user);
        history.push(assistant);
        if history.len() > HISTORY_CAPACITY {
            let excess = history.len() - HISTORY_CAPACITY;
            history.drain(..excess);
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.read().clone()
    }

    /// Clear context and history; safe on a fresh session
    pub async fn reset(&self) {
        self.context.lock().await.reset();
        self.history.write().clear();
        self.touch();
        tracing::info!(session_id = %self.id, "Session reset");
    }

    pub async fn info(&self) -> SessionInfo {
        let context = self.context.lock().await;
        SessionInfo {
            session_id: self.id.clone(),
            active: self.is_active(),
            created_at: self.created_at,
            idle_secs: self.last_activity.read().elapsed().as_secs(),
            turn_count: context.turn_count,
            messages: self.history.read().len(),
            filters: context.filters.clone(),
            preferences: serde_json::to_value(&context.preferences)
                .unwrap_or(serde_json::Value::Null),
            seen_products: context.seen_ids.len(),
            feedback_events: context.feedback_history.len(),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Check if session is expired
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    /// Close session
    pub fn close(&self) {
        *self.active.write() = false;
    }

    /// Is session active
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(
            max_sessions,
            Duration::from_secs(3600),
            Duration::from_secs(300),
        )
    }

    /// Create a new session manager with custom timeout and cleanup interval
    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start a background task that removes expired sessions every
    /// `cleanup_interval`. Send `true` on the returned channel to stop it.
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

    /// Create a session with a generated id
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        self.insert(uuid::Uuid::new_v4().to_string())
    }

    /// Existing session for `id`, or a new one under that id (generated
    /// when absent)
    pub fn get_or_create(&self, id: Option<&str>) -> Result<Arc<Session>, ServerError> {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => match self.get(id) {
                Some(session) => Ok(session),
                None => self.insert(id.to_string()),
            },
            None => self.create(),
        }
    }

    fn insert(&self, id: String) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if let Some(existing) = sessions.get(&id) {
            return Ok(Arc::clone(existing));
        }

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                metrics::counter!("stylist_errors_total", "step" => "session").increment(1);
                return Err(ServerError::Capacity(format!(
                    "max sessions reached ({})",
                    self.max_sessions
                )));
            }
        }

        let session = Arc::new(Session::new(id.clone()));
        sessions.insert(id.clone(), Arc::clone(&session));
        metrics::gauge!("stylist_active_sessions").set(sessions.len() as f64);

        tracing::info!(session_id = %id, "Created session");
        Ok(session)
    }

    /// Get a session by ID
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.remove(id) {
            Some(session) => {
                session.close();
                metrics::gauge!("stylist_active_sessions").set(sessions.len() as f64);
                tracing::info!(session_id = %id, "Removed session");
                true
            },
            None => false,
        }
    }

    /// Get active session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove expired sessions, returning how many were dropped
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
            if let Some(session) = sessions.remove(id) {
                session.close();
                tracing::info!(session_id = %id, "Expired session");
            }
        }
        if !expired.is_empty() {
            metrics::gauge!("stylist_active_sessions").set(sessions.len() as f64);
        }
        expired.len()
    }

    /// List all session IDs
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

//! Per-session query history.
//!
//! A session owns an ordered, append-only list of the predictions it made.
//! Starting a session begins with an empty list; lists are never shared.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::league::League;
use crate::predict::Prediction;

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub league: League,
    pub team1: String,
    pub team2: String,
    pub result: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<&Prediction> for HistoryEntry {
    fn from(prediction: &Prediction) -> Self {
        Self {
            league: prediction.league,
            team1: prediction.team1.clone(),
            team2: prediction.team2.clone(),
            result: prediction.formatted(),
            recorded_at: Utc::now(),
        }
    }
}

/// Insertion-ordered history. No dedup, no cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryHistory {
    entries: Vec<HistoryEntry>,
}

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A live session: its history and when it was last used.
#[derive(Debug, Clone)]
struct Session {
    history: QueryHistory,
    last_seen: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            history: QueryHistory::new(),
            last_seen: Instant::now(),
        }
    }
}

/// In-memory session handles for the HTTP layer.
///
/// Each session's history is only touched by the request carrying its id.
/// Sessions idle for longer than `idle_timeout` are dropped, and the store
/// never holds more than `max_sessions`: starting one past the cap evicts
/// the least recently used.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    /// `max_sessions` of 0 is treated as 1.
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Open a new session with an empty history
    pub async fn start(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.inner.write().await;

        if sessions.len() >= self.max_sessions {
            let now = Instant::now();
            sessions.retain(|_, s| now.duration_since(s.last_seen) < self.idle_timeout);
        }
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!("Session cap {} reached, evicted {}", self.max_sessions, oldest);
            }
        }

        sessions.insert(id, Session::new());
        id
    }

    /// Clear a session's history. Returns false for unknown sessions.
    pub async fn reset(&self, id: Uuid) -> bool {
        match self.live_mut(&mut *self.inner.write().await, id) {
            Some(session) => {
                session.history.reset();
                true
            }
            None => false,
        }
    }

    /// Append to a session's history. Returns false for unknown sessions.
    pub async fn record(&self, id: Uuid, entry: HistoryEntry) -> bool {
        match self.live_mut(&mut *self.inner.write().await, id) {
            Some(session) => {
                session.history.append(entry);
                true
            }
            None => false,
        }
    }

    pub async fn history(&self, id: Uuid) -> Option<QueryHistory> {
        self.live_mut(&mut *self.inner.write().await, id)
            .map(|session| session.history.clone())
    }

    pub async fn end(&self, id: Uuid) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    /// Drop every session idle past the timeout. Returns how many went.
    pub async fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_seen) < self.idle_timeout);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Look up a session, expiring it if idle and refreshing it otherwise.
    fn live_mut<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, Session>,
        id: Uuid,
    ) -> Option<&'a mut Session> {
        let now = Instant::now();
        let expired = now.duration_since(sessions.get(&id)?.last_seen) >= self.idle_timeout;
        if expired {
            sessions.remove(&id);
            debug!("Session {} expired", id);
            return None;
        }
        let session = sessions.get_mut(&id)?;
        session.last_seen = now;
        Some(session)
    }
}

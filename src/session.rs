//! Conversation session store
//!
//! Tracks per-session conversational context so a generation call can
//! be handed the full history instead of just the latest turn. The store
//! owns a guarded map injected into handlers; sessions hold turns in
//! append order and are only ever removed as a whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human asking questions
    User,
    /// The generation model
    Model,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Sender role
    pub role: Role,
    /// Message text
    pub text: String,
    /// When the turn was appended; defaults to now for turns arriving
    /// over the wire without one
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a user turn stamped now
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a model turn stamped now
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Process-wide session store
///
/// Cloning is cheap; all clones share the same underlying map. The mutex
/// guards individual map operations only and is never held across an
/// `.await`, so a provider call in flight does not block other sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Vec<Turn>>>>,
}

impl SessionStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh session identifier
    ///
    /// The backing entry is created lazily on first
    /// [`append_and_get_history`](Self::append_and_get_history) call,
    /// so an id that is never used costs nothing.
    pub fn create(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Appends a turn and returns the full ordered history
    ///
    /// Unknown session ids are initialized on the spot (create-if-absent):
    /// a client that lost its session id simply starts a fresh history
    /// rather than receiving an error.
    pub fn append_and_get_history(&self, session_id: &str, turn: Turn) -> Vec<Turn> {
        let mut sessions = self.inner.lock().expect("session store mutex poisoned");
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(turn);
        history.clone()
    }

    /// Overwrites a session's history with what the gateway returned
    ///
    /// The gateway may append its own model turn; the store persists
    /// exactly what it was given rather than re-deriving the history.
    /// Under concurrent use of one session id this is last-write-wins;
    /// the serving model assumes a single logical client per session.
    pub fn replace_history(&self, session_id: &str, history: Vec<Turn>) {
        let mut sessions = self.inner.lock().expect("session store mutex poisoned");
        sessions.insert(session_id.to_string(), history);
    }

    /// Removes a session if present; absent sessions are not an error
    pub fn delete(&self, session_id: &str) {
        let mut sessions = self.inner.lock().expect("session store mutex poisoned");
        if sessions.remove(session_id).is_some() {
            tracing::debug!("Deleted session {}", session_id);
        }
    }

    /// Returns a snapshot of a session's history, if it exists
    pub fn history(&self, session_id: &str) -> Option<Vec<Turn>> {
        let sessions = self.inner.lock().expect("session store mutex poisoned");
        sessions.get(session_id).cloned()
    }

    /// Whether the store currently holds the given session
    pub fn contains(&self, session_id: &str) -> bool {
        let sessions = self.inner.lock().expect("session store mutex poisoned");
        sessions.contains_key(session_id)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        let sessions = self.inner.lock().expect("session store mutex poisoned");
        sessions.len()
    }

    /// Whether the store holds no sessions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_returns_unique_ids() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);
        // Identifier generation has no side effect on the map
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_creates_session_if_absent() {
        let store = SessionStore::new();
        let history = store.append_and_get_history("unseen", Turn::user("hello"));
        assert_eq!(history.len(), 1);
        assert!(store.contains("unseen"));
    }

    #[test]
    fn test_append_history_length_matches_appends() {
        let store = SessionStore::new();
        let id = store.create();
        for i in 0..5 {
            let history = store.append_and_get_history(&id, Turn::user(format!("msg {}", i)));
            assert_eq!(history.len(), i + 1);
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let store = SessionStore::new();
        let id = store.create();
        store.append_and_get_history(&id, Turn::user("first"));
        store.append_and_get_history(&id, Turn::model("second"));
        let history = store.append_and_get_history(&id, Turn::user("third"));
        assert_eq!(history[0].text, "first");
        assert_eq!(history[1].text, "second");
        assert_eq!(history[2].text, "third");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Model);
    }

    #[test]
    fn test_replace_history_persists_exactly() {
        let store = SessionStore::new();
        let id = store.create();
        store.append_and_get_history(&id, Turn::user("question"));

        let replacement = vec![Turn::user("question"), Turn::model("answer")];
        store.replace_history(&id, replacement);

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text, "answer");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SessionStore::new();
        store.delete("never-existed");
        let id = store.create();
        store.append_and_get_history(&id, Turn::user("hi"));
        store.delete(&id);
        store.delete(&id);
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_delete_then_append_starts_fresh() {
        let store = SessionStore::new();
        let id = store.create();
        store.append_and_get_history(&id, Turn::user("one"));
        store.append_and_get_history(&id, Turn::model("two"));
        store.delete(&id);

        let history = store.append_and_get_history(&id, Turn::user("restart"));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "restart");
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let clone = store.clone();
        clone.append_and_get_history("shared", Turn::user("hi"));
        assert!(store.contains("shared"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }
}

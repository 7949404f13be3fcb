use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::message::Conversation;

/// One conversation thread and its history.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub conversation: Conversation,
    /// Turns that produced a final answer.
    pub turns: u64,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            conversation: Conversation::new(),
            turns: 0,
        }
    }

    pub fn record_turn(&mut self) {
        self.turns += 1;
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Process-lifetime map of session id to session. Entries are never evicted,
/// so memory grows with the number of distinct ids seen.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, creating it when unknown. A missing or
    /// blank id gets a freshly generated one; any other id is kept verbatim.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, SharedSession) {
        let id = match id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "creating session");
                Arc::new(Mutex::new(Session::new(id.clone())))
            })
            .clone();
        (id, session)
    }

    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let sessions = self.sessions.lock().await;
        sessions.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

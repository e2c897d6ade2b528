use crate::conversation::ConversationChain;
use crate::ChatHistory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

/// Per-session state: the active conversation and the last rendered history.
#[derive(Default)]
pub struct SessionState {
    pub conversation: Option<ConversationChain>,
    pub chat_history: ChatHistory,
}

impl SessionState {
    /// Swaps in a conversation over a new upload and clears the history.
    pub fn replace_conversation(&mut self, conversation: ConversationChain) {
        self.conversation = Some(conversation);
        self.chat_history = ChatHistory::default();
    }
}

struct SessionEntry {
    state: Arc<Mutex<SessionState>>,
    last_seen: Instant,
}

/// In-process session store. Idle sessions are dropped lazily on access.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<Mutex<SessionState>>> {
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions);
        sessions.get_mut(&id).map(|entry| {
            entry.last_seen = Instant::now();
            entry.state.clone()
        })
    }

    pub async fn get_or_create(&self, id: SessionId) -> Arc<Mutex<SessionState>> {
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions);
        let entry = sessions.entry(id).or_insert_with(|| SessionEntry {
            state: Arc::new(Mutex::new(SessionState::default())),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.state.clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn prune(&self, sessions: &mut HashMap<SessionId, SessionEntry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "expired idle sessions");
        }
    }
}

//! Per-browser chat session state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use docbot_core::ChatTurn;

/// Everything one browser session remembers
///
/// `user_prompt_history` and `chat_answer_history` always have the same
/// length; `chat_history` holds two turns (human, then ai) per exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub user_prompt_history: Vec<String>,
    pub chat_answer_history: Vec<String>,
    pub chat_history: Vec<ChatTurn>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, as on logout
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Append one completed exchange
    ///
    /// `formatted_answer` is what the page shows; `answer` is the raw model
    /// text that later questions see as history.
    pub fn record(&mut self, prompt: &str, formatted_answer: String, answer: &str) {
        self.user_prompt_history.push(prompt.to_string());
        self.chat_answer_history.push(formatted_answer);
        self.chat_history.push(ChatTurn::human(prompt));
        self.chat_history.push(ChatTurn::ai(answer));
    }

    /// `(prompt, formatted answer)` pairs, oldest first
    pub fn exchanges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.user_prompt_history
            .iter()
            .zip(self.chat_answer_history.iter())
            .map(|(prompt, answer)| (prompt.as_str(), answer.as_str()))
    }

    pub fn total_messages(&self) -> usize {
        self.chat_history.len()
    }
}

pub type SharedSession = Arc<Mutex<SessionState>>;

/// Sessions untouched for this long are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: SharedSession,
    last_access: Instant,
}

/// Server-side session table keyed by the session cookie
///
/// Every lookup refreshes the entry's last access; creating a session sweeps
/// out the ones idle for longer than the timeout.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Start an empty session and return its id
    pub async fn create(&self) -> (String, SharedSession) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(SessionState::new()));
        let now = Instant::now();

        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) < self.idle_timeout);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "dropped idle sessions");
        }

        sessions.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_access: now,
            },
        );
        (id, session)
    }

    /// Live session for `id`; an idle one is dropped instead
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let entry = sessions.get_mut(id)?;
        if now.duration_since(entry.last_access) >= self.idle_timeout {
            sessions.remove(id);
            return None;
        }
        entry.last_access = now;
        Some(entry.session.clone())
    }

    /// Forget a session, as on logout
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_core::TurnRole;

    #[test]
    fn test_record_keeps_sequences_parallel() {
        let mut state = SessionState::new();
        state.record("q1", "a1 \n\n ".to_string(), "a1");
        state.record("q2", "a2 \n\n ".to_string(), "a2");

        assert_eq!(state.user_prompt_history, vec!["q1", "q2"]);
        assert_eq!(state.chat_answer_history.len(), 2);
        assert_eq!(state.total_messages(), 4);

        let roles: Vec<TurnRole> = state.chat_history.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::Human, TurnRole::Ai, TurnRole::Human, TurnRole::Ai]
        );

        let exchanges: Vec<(&str, &str)> = state.exchanges().collect();
        assert_eq!(exchanges[1], ("q2", "a2 \n\n "));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = SessionState::new();
        state.record("q", "a".to_string(), "a");
        state.reset();
        assert_eq!(state, SessionState::new());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new();
        let (first_id, first) = store.create().await;
        let (second_id, _) = store.create().await;
        assert_ne!(first_id, second_id);

        first.lock().await.record("q", "a".to_string(), "a");

        let second = store.get(&second_id).await.unwrap();
        assert!(second.lock().await.chat_history.is_empty());
        assert_eq!(store.len().await, 2);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new().with_idle_timeout(Duration::from_secs(60));
        let (idle_id, _) = store.create().await;
        let (active_id, _) = store.create().await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(&active_id).await.is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.get(&idle_id).await.is_none());
        assert!(store.get(&active_id).await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cookieless_visits_do_not_accumulate() {
        let store = SessionStore::new().with_idle_timeout(Duration::from_secs(60));
        for _ in 0..1000 {
            store.create().await;
        }
        assert_eq!(store.len().await, 1000);

        tokio::time::advance(Duration::from_secs(61)).await;
        store.create().await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new();
        let (id, _) = store.create().await;

        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
        assert!(store.is_empty().await);
    }
}

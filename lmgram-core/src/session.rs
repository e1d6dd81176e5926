// ABOUTME: In-memory per-user session state: conversation transcript and message-id ledger.
// ABOUTME: One SessionStore is built at startup and shared; nothing survives a restart.
use crate::traits::{MessageId, UserId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (role, text) unit of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Snapshot of one user's state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Append-only conversation history, oldest first
    pub transcript: Vec<Turn>,
    /// Ids of every message shown in the chat, oldest first
    pub ledger: Vec<MessageId>,
}

#[derive(Default)]
struct SessionEntry {
    session: Session,
    turn_gate: Arc<AsyncMutex<()>>,
}

/// Process-wide map of UserId -> Session.
///
/// Every operation mutates a single map entry while holding that entry's
/// shard lock, so appends and drains for one user are linearized and no lock
/// is ever held across an await point.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<UserId, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the user's session, creating an empty one on first contact
    pub fn get_or_create(&self, user: &UserId) -> Session {
        self.sessions
            .entry(user.clone())
            .or_default()
            .session
            .clone()
    }

    pub fn append_turn(&self, user: &UserId, role: Role, text: impl Into<String>) {
        self.sessions
            .entry(user.clone())
            .or_default()
            .session
            .transcript
            .push(Turn::new(role, text));
    }

    /// Reset the transcript. The ledger is left alone.
    pub fn clear_transcript(&self, user: &UserId) {
        self.sessions
            .entry(user.clone())
            .or_default()
            .session
            .transcript
            .clear();
    }

    pub fn record_message_id(&self, user: &UserId, id: MessageId) {
        self.sessions
            .entry(user.clone())
            .or_default()
            .session
            .ledger
            .push(id);
    }

    pub fn record_message_ids(&self, user: &UserId, ids: impl IntoIterator<Item = MessageId>) {
        self.sessions
            .entry(user.clone())
            .or_default()
            .session
            .ledger
            .extend(ids);
    }

    /// Take the whole ledger, leaving it empty, in one atomic step.
    ///
    /// Ids recorded concurrently land either in the returned batch or in the
    /// fresh ledger, never in both and never nowhere.
    pub fn drain_ledger(&self, user: &UserId) -> Vec<MessageId> {
        let mut entry = self.sessions.entry(user.clone()).or_default();
        std::mem::take(&mut entry.session.ledger)
    }

    pub fn transcript(&self, user: &UserId) -> Vec<Turn> {
        self.sessions
            .get(user)
            .map(|e| e.session.transcript.clone())
            .unwrap_or_default()
    }

    pub fn ledger(&self, user: &UserId) -> Vec<MessageId> {
        self.sessions
            .get(user)
            .map(|e| e.session.ledger.clone())
            .unwrap_or_default()
    }

    /// Per-user gate that serializes whole conversation turns.
    ///
    /// Gates are never shared between users.
    pub fn turn_gate(&self, user: &UserId) -> Arc<AsyncMutex<()>> {
        Arc::clone(&self.sessions.entry(user.clone()).or_default().turn_gate)
    }

    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }
}

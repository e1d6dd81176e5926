// ABOUTME: Bulk deletion of every tracked chat message for one user
// ABOUTME: Per-message refusals are expected and folded into a summary, never fatal

use crate::messages;
use crate::metrics;
use crate::session::SessionStore;
use crate::traits::{ChatClient, ChatId, MessageId, UserId};
use std::sync::Arc;

/// Result of one deletion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionResult {
    Deleted,
    /// The platform refused (message too old, missing rights, already gone)
    Denied(String),
}

/// Tally of a purge run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub attempted: usize,
    pub deleted: usize,
    pub denied: usize,
    /// Ids of the confirmation message, now the first ledger entries
    pub confirmation: Vec<MessageId>,
}

impl PurgeSummary {
    fn record(&mut self, result: &DeletionResult) {
        self.attempted += 1;
        match result {
            DeletionResult::Deleted => self.deleted += 1,
            DeletionResult::Denied(_) => self.denied += 1,
        }
    }
}

#[derive(Debug)]
pub enum PurgeOutcome {
    /// The ledger was empty; no deletions were requested
    NoMessages,
    /// Every drained id was attempted and the confirmation was sent
    Purged(PurgeSummary),
    /// The purge could not be completed
    Failed(anyhow::Error),
}

pub struct DeletionController {
    sessions: SessionStore,
    chat: Arc<dyn ChatClient>,
}

impl DeletionController {
    pub fn new(sessions: SessionStore, chat: Arc<dyn ChatClient>) -> Self {
        Self { sessions, chat }
    }

    /// Delete every ledgered message of `user` in `chat`.
    ///
    /// The ledger is drained before any deletion, so ids recorded while the
    /// purge runs survive for the next one. The transcript is not touched.
    pub async fn purge_messages(&self, user: &UserId, chat: &ChatId) -> PurgeOutcome {
        let ids = self.sessions.drain_ledger(user);
        if ids.is_empty() {
            tracing::debug!(user = %user, "Purge requested with an empty ledger");
            return PurgeOutcome::NoMessages;
        }

        let mut summary = PurgeSummary::default();
        for id in &ids {
            let result = self.delete_one(chat, id).await;
            summary.record(&result);
        }
        metrics::record_purge(summary.deleted, summary.denied);

        match self.chat.send_text(chat, messages::PURGE_CONFIRMED).await {
            Ok(sent) => {
                self.sessions.record_message_ids(user, sent.iter().cloned());
                summary.confirmation = sent;
                tracing::info!(
                    user = %user,
                    chat = %chat,
                    attempted = summary.attempted,
                    deleted = summary.deleted,
                    denied = summary.denied,
                    "Purge completed"
                );
                PurgeOutcome::Purged(summary)
            }
            Err(e) => {
                self.sessions.record_message_ids(user, e.delivered);
                PurgeOutcome::Failed(e.error.context("Failed to send purge confirmation"))
            }
        }
    }

    async fn delete_one(&self, chat: &ChatId, id: &MessageId) -> DeletionResult {
        match self.chat.delete_message(chat, id).await {
            Ok(()) => DeletionResult::Deleted,
            Err(e) => {
                tracing::debug!(chat = %chat, message_id = %id, error = %e, "Message not deleted");
                DeletionResult::Denied(e.to_string())
            }
        }
    }
}

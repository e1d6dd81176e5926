// ABOUTME: Routes inbound chat messages to the command handlers and the conversation controller
// ABOUTME: Records the id of every inbound and outbound message into the sender's ledger

use crate::commands::{parse_message, BotCommand, ParseResult};
use crate::conversation::ConversationController;
use crate::deletion::{DeletionController, PurgeOutcome};
use crate::inference::InferenceClient;
use crate::messages;
use crate::metrics;
use crate::session::SessionStore;
use crate::traits::{ChatClient, IncomingMessage};
use std::sync::Arc;

pub struct Dispatcher {
    sessions: SessionStore,
    chat: Arc<dyn ChatClient>,
    conversation: ConversationController,
    deletion: DeletionController,
}

impl Dispatcher {
    pub fn new(
        sessions: SessionStore,
        chat: Arc<dyn ChatClient>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            conversation: ConversationController::new(sessions.clone(), inference),
            deletion: DeletionController::new(sessions.clone(), Arc::clone(&chat)),
            sessions,
            chat,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message end to end.
    ///
    /// Never fails: delivery problems are logged and the user's session
    /// stays usable.
    pub async fn dispatch(&self, msg: IncomingMessage) {
        self.sessions
            .record_message_id(&msg.user, msg.message_id.clone());

        let preview: String = msg.body.chars().take(50).collect();
        tracing::info!(
            user = %msg.user,
            chat = %msg.chat,
            message_id = %msg.message_id,
            preview = %preview,
            "Processing incoming message"
        );

        match parse_message(&msg.body) {
            ParseResult::Command(cmd) => {
                metrics::record_message_received("command");
                self.handle_command(&msg, cmd).await;
            }
            ParseResult::Message(text) => {
                metrics::record_message_received("chat");
                self.handle_text(&msg, &text).await;
            }
            ParseResult::UnknownCommand(name) => {
                metrics::record_message_received("ignored");
                tracing::debug!(user = %msg.user, command = %name, "Ignoring unknown command");
            }
            ParseResult::Ignore => {
                metrics::record_message_received("ignored");
            }
        }
    }

    async fn handle_command(&self, msg: &IncomingMessage, cmd: BotCommand) {
        match cmd {
            BotCommand::Start => self.reply(msg, messages::HELP_TEXT).await,
            BotCommand::Clear => {
                self.conversation.clear(&msg.user).await;
                tracing::info!(user = %msg.user, "Transcript cleared");
                self.reply(msg, messages::CONTEXT_CLEARED).await;
            }
            BotCommand::Purge => match self.deletion.purge_messages(&msg.user, &msg.chat).await {
                PurgeOutcome::NoMessages => self.reply(msg, messages::NO_MESSAGES).await,
                PurgeOutcome::Purged(_) => {}
                PurgeOutcome::Failed(e) => {
                    let detail = format!("{e:#}");
                    tracing::error!(
                        user = %msg.user,
                        chat = %msg.chat,
                        error = %detail,
                        "Purge failed"
                    );
                    self.reply(msg, messages::PURGE_FAILED).await;
                }
            },
        }
    }

    async fn handle_text(&self, msg: &IncomingMessage, text: &str) {
        if let Err(e) = self.chat.send_typing(&msg.chat).await {
            tracing::debug!(chat = %msg.chat, error = %e, "Typing indicator failed");
        }

        let reply = self.conversation.handle_user_text(&msg.user, text).await;
        self.reply(msg, reply.text()).await;
    }

    /// Send `text` to the message's chat and ledger the resulting ids
    async fn reply(&self, msg: &IncomingMessage, text: &str) {
        match self.chat.send_text(&msg.chat, text).await {
            Ok(ids) => self.sessions.record_message_ids(&msg.user, ids),
            Err(e) => {
                tracing::error!(
                    user = %msg.user,
                    chat = %msg.chat,
                    delivered = e.delivered.len(),
                    error = %e,
                    "Failed to send reply"
                );
                // Chunks that did arrive are still in the chat
                self.sessions.record_message_ids(&msg.user, e.delivered);
            }
        }
    }
}

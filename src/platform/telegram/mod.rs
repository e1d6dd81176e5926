// ABOUTME: Telegram platform implementation using teloxide long polling
// ABOUTME: Turns text updates into IncomingMessage and implements ChatClient for replies and purges

pub mod channel;

pub use channel::TelegramChannel;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lmgram_core::config::TelegramConfig;
use lmgram_core::{
    ChatClient, ChatId, CommandHint, IncomingMessage, MessageId, SendError, UserId,
};
use std::pin::Pin;
use teloxide::prelude::*;
use teloxide::types::{BotCommand as TgBotCommand, MediaKind, Message, MessageKind, UpdateKind};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

/// Inbound text messages, in the order Telegram delivered them
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Seconds the Bot API holds a getUpdates call open
const POLL_TIMEOUT_SECS: u32 = 30;

/// Telegram platform implementation using teloxide with long polling
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
    /// Bot's numeric user ID
    bot_user_id: u64,
    bot_username: String,
}

impl TelegramPlatform {
    /// Create a new TelegramPlatform from config.
    ///
    /// Resolves the bot's user ID via the `getMe` API call, which also
    /// rejects a bad token before polling starts.
    pub async fn new(config: &TelegramConfig) -> Result<Self> {
        let bot = Bot::new(&config.bot_token);

        let me = bot.get_me().await.context("Failed to call Telegram getMe")?;
        let bot_user_id = me.id.0;
        let bot_username = me.username().to_string();

        tracing::info!(
            bot_username = %bot_username,
            bot_id = bot_user_id,
            "Telegram bot authenticated"
        );

        Ok(Self {
            bot,
            bot_user_id,
            bot_username,
        })
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    /// Start long polling and return the stream of inbound text messages.
    ///
    /// The polling task stops once the returned stream is dropped.
    pub fn event_stream(&self) -> EventStream {
        let (tx, rx) = mpsc::channel(256);
        let bot = self.bot.clone();
        let bot_user_id = self.bot_user_id;

        tokio::spawn(async move {
            let mut offset: i32 = 0;

            loop {
                let updates = match bot
                    .get_updates()
                    .offset(offset)
                    .timeout(POLL_TIMEOUT_SECS)
                    .await
                {
                    Ok(updates) => updates,
                    Err(e) => {
                        tracing::warn!(
                            platform = "telegram",
                            error = %e,
                            "Long polling error, retrying in 5s"
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                for update in &updates {
                    offset = update.id.as_offset();

                    let message = match &update.kind {
                        UpdateKind::Message(msg) => msg,
                        _ => continue,
                    };

                    let Some(incoming) = to_incoming(message, bot_user_id) else {
                        continue;
                    };

                    if tx.send(incoming).await.is_err() {
                        tracing::warn!(platform = "telegram", "Event stream receiver dropped");
                        return;
                    }
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    fn channel(&self, chat: &ChatId) -> Result<TelegramChannel> {
        TelegramChannel::for_chat(chat, self.bot.clone())
    }
}

/// Convert a Telegram message into an IncomingMessage.
///
/// Only text messages from someone other than the bot are relayed.
fn to_incoming(message: &Message, bot_user_id: u64) -> Option<IncomingMessage> {
    let body = match &message.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(text) => text.text.clone(),
            _ => return None,
        },
        _ => return None,
    };

    let from = message.from.as_ref()?;
    if from.id.0 == bot_user_id {
        return None;
    }

    Some(IncomingMessage {
        user: UserId::new(from.id.0.to_string()),
        chat: ChatId::new(message.chat.id.0.to_string()),
        message_id: MessageId::new(message.id.0.to_string()),
        body,
    })
}

#[async_trait]
impl ChatClient for TelegramPlatform {
    async fn send_text(&self, chat: &ChatId, text: &str) -> Result<Vec<MessageId>, SendError> {
        self.channel(chat)?.send_chunked(text).await
    }

    async fn delete_message(&self, chat: &ChatId, id: &MessageId) -> Result<()> {
        self.channel(chat)?.delete(id).await
    }

    async fn send_typing(&self, chat: &ChatId) -> Result<()> {
        self.channel(chat)?.set_typing().await
    }

    async fn register_commands(&self, hints: &[CommandHint]) -> Result<()> {
        let commands: Vec<TgBotCommand> = hints
            .iter()
            .map(|h| TgBotCommand::new(h.command, h.description))
            .collect();
        self.bot
            .set_my_commands(commands)
            .await
            .context("Failed to register bot commands")?;
        tracing::info!(count = hints.len(), "Registered bot command menu");
        Ok(())
    }
}

// ABOUTME: A single Telegram chat as seen by the bot: send, delete and typing calls
// ABOUTME: Handles 4096-char chunking and converts between lmgram ids and Bot API ids

use anyhow::{Context, Result};
use lmgram_core::{ChatId, MessageId, SendError};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId as TgChatId, MessageId as TgMessageId};

/// Maximum message length for Telegram Bot API
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// One Telegram chat bound to the bot handle
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    chat_id: TgChatId,
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(chat_id: TgChatId, bot: Bot) -> Self {
        Self { chat_id, bot }
    }

    /// Build a channel from an lmgram chat id
    pub fn for_chat(chat: &ChatId, bot: Bot) -> Result<Self> {
        Ok(Self::new(parse_chat_id(chat)?, bot))
    }

    /// Send a text message, splitting into chunks if it exceeds Telegram's limit.
    /// Returns the id of every message that was delivered, in order. On
    /// failure the error carries the ids of the chunks sent before it.
    pub async fn send_chunked(&self, text: &str) -> Result<Vec<MessageId>, SendError> {
        let chunks = chunk_text(text, MAX_MESSAGE_LENGTH);
        let total = chunks.len();
        let mut ids = Vec::with_capacity(total);

        for (index, chunk) in chunks.into_iter().enumerate() {
            match self.bot.send_message(self.chat_id, chunk).await {
                Ok(sent) => ids.push(MessageId::new(sent.id.0.to_string())),
                Err(e) => {
                    let error = anyhow::Error::new(e).context(format!(
                        "Failed to send message chunk {} of {}",
                        index + 1,
                        total
                    ));
                    return Err(SendError::partial(ids, error));
                }
            }
        }
        Ok(ids)
    }

    pub async fn delete(&self, id: &MessageId) -> Result<()> {
        let message_id = parse_message_id(id)?;
        self.bot
            .delete_message(self.chat_id, message_id)
            .await
            .with_context(|| format!("Failed to delete message {}", id))?;
        Ok(())
    }

    pub async fn set_typing(&self) -> Result<()> {
        // Telegram typing indicators auto-expire; there is no "stop typing" call
        self.bot
            .send_chat_action(self.chat_id, ChatAction::Typing)
            .await
            .context("Failed to send typing action")?;
        Ok(())
    }
}

pub fn parse_chat_id(chat: &ChatId) -> Result<TgChatId> {
    let raw = chat
        .as_str()
        .parse::<i64>()
        .with_context(|| format!("Invalid Telegram chat ID: {}", chat))?;
    Ok(TgChatId(raw))
}

pub fn parse_message_id(id: &MessageId) -> Result<TgMessageId> {
    let raw = id
        .as_str()
        .parse::<i32>()
        .with_context(|| format!("Invalid Telegram message ID: {}", id))?;
    Ok(TgMessageId(raw))
}

/// Split text into chunks at line boundaries, falling back to character boundaries
pub fn chunk_text(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining);
            break;
        }

        // Never cut through a multi-byte character
        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let split_at = remaining[..limit]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(limit);

        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }

    chunks
}

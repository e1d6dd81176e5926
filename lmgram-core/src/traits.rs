// ABOUTME: Platform abstraction for the chat side of the relay
// ABOUTME: Identifier newtypes, inbound message type, and the ChatClient trait

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a chat participant; key for all per-user state
    UserId
);
string_id!(
    /// Platform chat identifier (a DM or a group)
    ChatId
);
string_id!(
    /// Platform-assigned identifier of a single message in a chat
    MessageId
);

// =============================================================================
// Inbound
// =============================================================================

/// A text message delivered by the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Who wrote it
    pub user: UserId,
    /// Where it was written
    pub chat: ChatId,
    /// The id the platform assigned to it
    pub message_id: MessageId,
    /// Message text, commands included
    pub body: String,
}

/// A command suggestion shown by the platform when the user types "/"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHint {
    pub command: &'static str,
    pub description: &'static str,
}

// =============================================================================
// Outbound
// =============================================================================

/// A send that failed, possibly partway through a chunked message.
///
/// `delivered` holds the ids of the chunks that reached the chat before the
/// failure; they still need to be ledgered.
#[derive(Debug, thiserror::Error)]
#[error("{error:#}")]
pub struct SendError {
    pub delivered: Vec<MessageId>,
    pub error: anyhow::Error,
}

impl SendError {
    pub fn partial(delivered: Vec<MessageId>, error: anyhow::Error) -> Self {
        Self { delivered, error }
    }
}

impl From<anyhow::Error> for SendError {
    fn from(error: anyhow::Error) -> Self {
        Self::partial(Vec::new(), error)
    }
}

/// Outbound operations the relay needs from a chat platform.
///
/// `send_text` returns every id the platform assigned. Platforms that split
/// long messages return one id per chunk, in order.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, chat: &ChatId, text: &str) -> Result<Vec<MessageId>, SendError>;

    /// Delete one message; fails when the platform refuses
    async fn delete_message(&self, chat: &ChatId, id: &MessageId) -> Result<()>;

    /// Show a "typing..." indicator while a reply is being produced
    async fn send_typing(&self, _chat: &ChatId) -> Result<()> {
        Ok(())
    }

    /// Register the command hints shown in the platform's UI
    async fn register_commands(&self, _hints: &[CommandHint]) -> Result<()> {
        Ok(())
    }
}

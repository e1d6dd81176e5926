// ABOUTME: Slash-command parsing for inbound chat messages
// ABOUTME: Recognizes /start, /clear, /del_message (with @botname suffixes) and free text

use crate::traits::CommandHint;

/// A command the bot acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Show the help text
    Start,
    /// Reset the conversation transcript
    Clear,
    /// Delete every tracked chat message
    Purge,
}

impl BotCommand {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "start" | "help" => Some(Self::Start),
            "clear" => Some(Self::Clear),
            "del_message" | "purge" | "delete" => Some(Self::Purge),
            _ => None,
        }
    }
}

/// Result of parsing a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A recognized command
    Command(BotCommand),
    /// A "/something" the bot has no handler for
    UnknownCommand(String),
    /// Free text for the language model
    Message(String),
    /// Nothing to act on
    Ignore,
}

/// Parse a message body.
///
/// Commands start with `/`, may carry an `@botname` suffix (group chats) and
/// trailing arguments, which are ignored. Anything else that is not blank is
/// free text and is passed through untrimmed.
pub fn parse_message(body: &str) -> ParseResult {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return ParseResult::Ignore;
    }

    let Some(after_slash) = trimmed.strip_prefix('/') else {
        return ParseResult::Message(body.to_string());
    };

    let token = after_slash.split_whitespace().next().unwrap_or("");
    let name = token.split('@').next().unwrap_or("");
    if name.is_empty() {
        return ParseResult::UnknownCommand(String::new());
    }

    match BotCommand::from_name(name) {
        Some(cmd) => ParseResult::Command(cmd),
        None => ParseResult::UnknownCommand(name.to_string()),
    }
}

/// Hints registered with the platform at startup
pub fn command_hints() -> Vec<CommandHint> {
    vec![
        CommandHint {
            command: "start",
            description: "About the bot",
        },
        CommandHint {
            command: "clear",
            description: "Clear the conversation context",
        },
        CommandHint {
            command: "del_message",
            description: "Delete chat messages",
        },
    ]
}

// ABOUTME: Fixed user-visible texts sent by the bot
// ABOUTME: Kept in one place so handlers and tests agree on wording

pub const HELP_TEXT: &str = "\u{1F44B} Hi! I'm a Telegram bot backed by a local language model.\n\n\
What I can do:\n\
\u{1F9E0} I remember the context of our conversation\n\
\u{1F5D1} I can forget it with /clear\n\
\u{1F9FC} I can delete the chat messages with /del_message (the context is kept)\n\n\
\u{1F4CC} Commands:\n\
/start - show this help\n\
/clear - clear the conversation context\n\
/del_message - delete messages from the chat\n\n\
Ask me anything!";

pub const CONTEXT_CLEARED: &str = "Context cleared! \u{1F9F9}";

pub const NO_MESSAGES: &str = "No messages to delete.";

pub const PURGE_CONFIRMED: &str = "\u{1F504} All messages deleted (context kept).";

pub const PURGE_FAILED: &str =
    "\u{2757} Could not delete messages (check the bot's permissions).";

pub const INFERENCE_FAILED: &str = "\u{26A0} Something went wrong while processing your message.";

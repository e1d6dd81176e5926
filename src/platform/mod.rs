// ABOUTME: Chat platform implementations for lmgram
// ABOUTME: Telegram is the only platform; it implements lmgram_core::ChatClient

pub mod telegram;

pub use telegram::{EventStream, TelegramPlatform};

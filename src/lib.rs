// ABOUTME: Root library module for the lmgram binary
// ABOUTME: Telegram platform adapter and logging setup; core logic lives in lmgram-core

pub mod logging;
pub mod platform;

// Re-export the platform-agnostic modules from lmgram-core
pub use lmgram_core::commands;
pub use lmgram_core::config;
pub use lmgram_core::dispatch;
pub use lmgram_core::inference;
pub use lmgram_core::paths;
pub use lmgram_core::session;
pub use lmgram_core::traits;

// ABOUTME: Platform-agnostic core of the lmgram relay
// ABOUTME: Sessions, inference client, conversation and purge controllers, and the dispatcher

pub mod commands;
pub mod config;
pub mod conversation;
pub mod deletion;
pub mod dispatch;
pub mod inference;
pub mod messages;
pub mod metrics;
pub mod paths;
pub mod session;
pub mod testing;
pub mod traits;

pub use conversation::{ConversationController, TurnReply};
pub use deletion::{DeletionController, DeletionResult, PurgeOutcome, PurgeSummary};
pub use dispatch::Dispatcher;
pub use inference::{HttpInferenceClient, InferenceClient, InferenceError, TranscriptFormat};
pub use session::{Role, Session, SessionStore, Turn};
pub use traits::{
    ChatClient, ChatId, CommandHint, IncomingMessage, MessageId, SendError, UserId,
};

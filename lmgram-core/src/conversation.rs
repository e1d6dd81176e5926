// ABOUTME: One conversation turn: record the user's text, ask the model, record the reply
// ABOUTME: Failed turns keep the user's text but never add an assistant turn

use crate::inference::{InferenceClient, InferenceError};
use crate::messages;
use crate::metrics;
use crate::session::{Role, SessionStore};
use crate::traits::UserId;
use std::sync::Arc;
use std::time::Instant;

/// What to send back to the user after a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// The model's reply, already appended to the transcript
    Assistant(String),
    /// The generic failure notice; the transcript got no assistant turn
    Apology,
}

impl TurnReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Assistant(text) => text,
            Self::Apology => messages::INFERENCE_FAILED,
        }
    }

    pub fn is_apology(&self) -> bool {
        matches!(self, Self::Apology)
    }
}

pub struct ConversationController {
    sessions: SessionStore,
    inference: Arc<dyn InferenceClient>,
}

impl ConversationController {
    pub fn new(sessions: SessionStore, inference: Arc<dyn InferenceClient>) -> Self {
        Self {
            sessions,
            inference,
        }
    }

    /// Reset `user`'s transcript.
    ///
    /// Waits for any in-flight turn, so a late reply can never land in the
    /// fresh transcript.
    pub async fn clear(&self, user: &UserId) {
        let gate = self.sessions.turn_gate(user);
        let _turn = gate.lock().await;
        self.sessions.clear_transcript(user);
    }

    /// Run one turn for `user`.
    ///
    /// Turns for the same user are serialized, so the transcript handed to
    /// the endpoint always ends with this user's latest text.
    pub async fn handle_user_text(&self, user: &UserId, text: &str) -> TurnReply {
        let gate = self.sessions.turn_gate(user);
        let _turn = gate.lock().await;

        self.sessions.append_turn(user, Role::User, text);
        let transcript = self.sessions.transcript(user);

        let started = Instant::now();
        let result = self.inference.complete(&transcript).await;
        let elapsed = started.elapsed();

        match result {
            Ok(reply) => {
                metrics::record_inference("ok", elapsed);
                tracing::info!(
                    user = %user,
                    turns = transcript.len() + 1,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Inference reply received"
                );
                self.sessions.append_turn(user, Role::Assistant, reply.clone());
                TurnReply::Assistant(reply)
            }
            Err(e) => {
                metrics::record_inference(e.kind(), elapsed);
                log_inference_failure(user, &e);
                TurnReply::Apology
            }
        }
    }
}

fn log_inference_failure(user: &UserId, error: &InferenceError) {
    match error {
        InferenceError::Unavailable(reason) => {
            tracing::warn!(user = %user, reason = %reason, "Inference endpoint unreachable");
        }
        InferenceError::Http { status, body } => {
            tracing::error!(
                user = %user,
                status = *status,
                body = %body,
                "Inference endpoint reported an error"
            );
        }
        InferenceError::MalformedResponse(reason) => {
            tracing::error!(
                user = %user,
                reason = %reason,
                "Inference response protocol mismatch"
            );
        }
    }
}

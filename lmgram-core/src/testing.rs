// ABOUTME: In-memory doubles for ChatClient and InferenceClient
// ABOUTME: Let the dispatcher and controllers be tested without Telegram or a model server

use crate::inference::{InferenceClient, InferenceError};
use crate::session::Turn;
use crate::traits::{ChatClient, ChatId, CommandHint, MessageId, SendError};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A message captured by MockChat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub id: MessageId,
}

/// Chat platform double.
///
/// Assigns increasing numeric ids starting at 1000 to every sent message and
/// records every call. Deletion of ids added with `deny_deletion` fails.
/// With `split_lines` each line is delivered as its own message, the way a
/// chunking platform behaves.
pub struct MockChat {
    next_id: AtomicU64,
    sent: Mutex<Vec<SentMessage>>,
    deletions: Mutex<Vec<MessageId>>,
    denied: Mutex<HashSet<MessageId>>,
    typing: Mutex<Vec<ChatId>>,
    hints: Mutex<Vec<CommandHint>>,
    fail_sends: AtomicBool,
    fail_next: AtomicUsize,
    deliveries_left: Mutex<Option<usize>>,
    split_lines: AtomicBool,
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            sent: Mutex::new(Vec::new()),
            deletions: Mutex::new(Vec::new()),
            denied: Mutex::new(HashSet::new()),
            typing: Mutex::new(Vec::new()),
            hints: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            fail_next: AtomicUsize::new(0),
            deliveries_left: Mutex::new(None),
            split_lines: AtomicBool::new(false),
        }
    }

    /// Make deletion of `id` fail
    pub fn deny_deletion(&self, id: impl Into<MessageId>) {
        if let Ok(mut denied) = self.denied.lock() {
            denied.insert(id.into());
        }
    }

    /// Make every subsequent `send_text` fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make only the next `n` deliveries fail
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Let `n` more deliveries through, then fail every one after
    pub fn fail_after(&self, n: usize) {
        if let Ok(mut left) = self.deliveries_left.lock() {
            *left = Some(n);
        }
    }

    /// Deliver each line of a text as a separate message
    pub fn split_lines(&self, split: bool) {
        self.split_lines.store(split, Ordering::SeqCst);
    }

    fn next_delivery_fails(&self) -> bool {
        if self.fail_sends.load(Ordering::SeqCst) {
            return true;
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return true;
        }
        let Ok(mut left) = self.deliveries_left.lock() else {
            return false;
        };
        match left.as_mut() {
            Some(0) => true,
            Some(n) => {
                *n -= 1;
                false
            }
            None => false,
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.sent().pop()
    }

    /// Every id a deletion was requested for, in call order
    pub fn deletions(&self) -> Vec<MessageId> {
        self.deletions.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn typing_count(&self) -> usize {
        self.typing.lock().map(|t| t.len()).unwrap_or_default()
    }

    pub fn registered_hints(&self) -> Vec<CommandHint> {
        self.hints.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for MockChat {
    async fn send_text(&self, chat: &ChatId, text: &str) -> Result<Vec<MessageId>, SendError> {
        let chunks: Vec<&str> = if self.split_lines.load(Ordering::SeqCst) {
            text.split('\n').collect()
        } else {
            vec![text]
        };

        let mut delivered = Vec::new();
        for chunk in chunks {
            if self.next_delivery_fails() {
                return Err(SendError::partial(
                    delivered,
                    anyhow::anyhow!("mock send failure"),
                ));
            }
            let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(SentMessage {
                    chat: chat.clone(),
                    text: chunk.to_string(),
                    id: id.clone(),
                });
            }
            delivered.push(id);
        }
        Ok(delivered)
    }

    async fn delete_message(&self, _chat: &ChatId, id: &MessageId) -> Result<()> {
        if let Ok(mut deletions) = self.deletions.lock() {
            deletions.push(id.clone());
        }
        let denied = self
            .denied
            .lock()
            .map(|d| d.contains(id))
            .unwrap_or(false);
        if denied {
            anyhow::bail!("Bad Request: message can't be deleted");
        }
        Ok(())
    }

    async fn send_typing(&self, chat: &ChatId) -> Result<()> {
        if let Ok(mut typing) = self.typing.lock() {
            typing.push(chat.clone());
        }
        Ok(())
    }

    async fn register_commands(&self, hints: &[CommandHint]) -> Result<()> {
        if let Ok(mut stored) = self.hints.lock() {
            *stored = hints.to_vec();
        }
        Ok(())
    }
}

/// Inference double that replays queued results and keeps every transcript
/// it was asked to complete. An empty queue yields `Unavailable`.
#[derive(Default)]
pub struct MockInference {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<Vec<Turn>>>,
    delay: Option<Duration>,
}

impl MockInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    pub fn fail(self, error: InferenceError) -> Self {
        self.push(Err(error));
        self
    }

    /// Hold every completion for `delay`, like a slow model
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, result: Result<String, InferenceError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(result);
        }
    }

    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InferenceClient for MockInference {
    async fn complete(&self, transcript: &[Turn]) -> Result<String, InferenceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(transcript.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(InferenceError::Unavailable("no scripted reply".to_string())))
    }
}

//! Outbound side of the chat connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{MessageEvent, MessageId};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Failed to fetch message {0}: {1}")]
    Fetch(MessageId, String),

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A chat room the dispatcher can talk to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post `text`, optionally as a reply. Returns the new message's id.
    async fn send(&self, text: &str, reply_to: Option<MessageId>)
        -> Result<MessageId, TransportError>;

    /// Plain-text source of a message.
    ///
    /// Event feeds often deliver rendered markup; transports that can fetch
    /// the raw source override this.
    async fn plain_content(&self, event: &MessageEvent) -> Result<String, TransportError> {
        Ok(event.content.clone())
    }
}

/// A message captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

/// Transport that records sent messages (testing)
#[derive(Debug)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    next_id: AtomicU64,
}

impl RecordingTransport {
    /// Ids handed out start at `first_id`.
    pub fn new(first_id: MessageId) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(first_id),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Text of the most recent message.
    pub fn last_text(&self) -> Option<String> {
        self.sent().last().map(|m| m.text.clone())
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMessage {
                id,
                text: text.to_string(),
                reply_to,
            });
        Ok(id)
    }
}

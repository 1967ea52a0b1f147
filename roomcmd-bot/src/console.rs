//! Console transport: stdin lines are messages from one user, replies go to
//! stdout.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use roomcmd::{MessageEvent, MessageId, Transport, TransportError, UserId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// A single-user chat room on the terminal.
///
/// Incoming and outgoing messages share one id sequence, so replies can
/// point at the line that triggered them.
pub struct ConsoleTransport {
    user_id: UserId,
    user_name: String,
    next_id: AtomicU64,
    output: Mutex<Output>,
}

impl ConsoleTransport {
    /// Speak as `user_name` and print to stdout.
    pub fn new(user_id: UserId, user_name: impl Into<String>) -> Self {
        Self::with_output(user_id, user_name, tokio::io::stdout())
    }

    pub fn with_output(
        user_id: UserId,
        user_name: impl Into<String>,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            next_id: AtomicU64::new(1),
            output: Mutex::new(Box::new(output)),
        }
    }

    fn next_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Turn each non-blank line of `input` into a message event.
    ///
    /// Returns when input ends or the receiving side hangs up.
    pub async fn feed<R>(
        &self,
        input: R,
        events: mpsc::Sender<MessageEvent>,
    ) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event = MessageEvent {
                message_id: self.next_id(),
                user_id: self.user_id,
                user_name: self.user_name.clone(),
                content: line,
            };
            if events.send(event).await.is_err() {
                tracing::debug!("Dispatcher gone, stopping input");
                break;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConsoleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransport")
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(
        &self,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, TransportError> {
        let id = self.next_id();
        let line = match reply_to {
            Some(parent) => format!("[{}] :{} {}\n", id, parent, text),
            None => format!("[{}] {}\n", id, text),
        };
        let mut output = self.output.lock().await;
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
        Ok(id)
    }
}

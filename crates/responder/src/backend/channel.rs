use crate::Responder;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::channel::mpsc::{self, TryRecvError};
use futures::sink::SinkExt;
use log::warn;
use snatcher_core::Reply;

/// Bridges the engine to whatever actually talks to the responder.
///
/// Commands go out on `outbox`; replies captured by the bridge come back on
/// `inbox`.
pub struct ChannelResponder {
    outbox: mpsc::Sender<String>,
    inbox: mpsc::Receiver<Reply>,
    inbox_closed: bool,
}

impl ChannelResponder {
    pub fn new(outbox: mpsc::Sender<String>, inbox: mpsc::Receiver<Reply>) -> Self {
        Self {
            outbox,
            inbox,
            inbox_closed: false,
        }
    }

    /// Creates a responder together with the bridge-side ends: the stream of
    /// outgoing commands and the sink for replies.
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<String>, mpsc::Sender<Reply>) {
        let (command_tx, command_rx) = mpsc::channel(buffer);
        let (reply_tx, reply_rx) = mpsc::channel(buffer);
        (Self::new(command_tx, reply_rx), command_rx, reply_tx)
    }
}

#[async_trait]
impl Responder for ChannelResponder {
    async fn send(&mut self, command: &str) -> Result<()> {
        self.outbox
            .send(command.to_string())
            .await
            .map_err(|e| anyhow!("command outbox closed: {}", e))
    }

    async fn poll(&mut self) -> Result<Option<Reply>> {
        if self.inbox_closed {
            return Ok(None);
        }
        match self.inbox.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(TryRecvError::Closed) => {
                warn!("Reply inbox closed; no further replies will arrive");
                self.inbox_closed = true;
                Ok(None)
            }
            Err(TryRecvError::Empty) => Ok(None),
        }
    }
}

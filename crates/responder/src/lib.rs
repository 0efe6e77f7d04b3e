use anyhow::Result;
use async_trait::async_trait;
use snatcher_core::Reply;

pub mod backend;

pub use backend::{ChannelResponder, Script, ScriptedResponder, SentLog};

/// The external actor that answers one command at a time.
///
/// How a command reaches it (keystrokes, clipboard, an API) and how its
/// answers are captured is up to the implementation.
#[async_trait]
pub trait Responder: Send {
    /// Deliver a command. Returns once the command has been handed off,
    /// not when it has been answered.
    async fn send(&mut self, command: &str) -> Result<()>;

    /// Non-blocking check for a reply that has arrived since the last call.
    async fn poll(&mut self) -> Result<Option<Reply>>;
}

mod channel;
mod scripted;

pub use crate::Responder;

pub use channel::ChannelResponder;
pub use scripted::{Script, ScriptedResponder, SentLog};

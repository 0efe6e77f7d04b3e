use crate::Responder;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use snatcher_core::Reply;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the scripted responder does with the next command it receives.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer immediately.
    Reply(Reply),
    /// Answer only after `polls` empty polls.
    Delayed { reply: Reply, polls: u32 },
    /// Never answer.
    Silence,
    /// Refuse the command itself.
    Fail(String),
}

/// Shared record of every command a [`ScriptedResponder`] received.
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<String>>>);

impl SentLog {
    pub fn commands(&self) -> Vec<String> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, command: &str) {
        if let Ok(mut commands) = self.0.lock() {
            commands.push(command.to_string());
        }
    }
}

/// Stand-in responder that replays a fixed script, one entry per command.
/// Once the script runs out it stays silent.
#[derive(Default)]
pub struct ScriptedResponder {
    script: VecDeque<Script>,
    pending: Option<(Reply, u32)>,
    sent: SentLog,
}

impl ScriptedResponder {
    pub fn new<I: IntoIterator<Item = Script>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> SentLog {
        self.sent.clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn send(&mut self, command: &str) -> Result<()> {
        self.sent.push(command);
        match self.script.pop_front() {
            Some(Script::Reply(reply)) => self.pending = Some((reply, 0)),
            Some(Script::Delayed { reply, polls }) => self.pending = Some((reply, polls)),
            Some(Script::Silence) | None => {}
            Some(Script::Fail(reason)) => return Err(anyhow!(reason)),
        }
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<Reply>> {
        match self.pending.take() {
            Some((reply, 0)) => Ok(Some(reply)),
            Some((reply, polls)) => {
                self.pending = Some((reply, polls - 1));
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

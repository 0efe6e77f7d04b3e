use async_std::future::timeout;
use async_std::task;
use futures::channel::mpsc;
use futures::StreamExt;
use log::{debug, warn};
use snatcher_core::{EngineInput, Reply, ReplyShape, SessionConfig, SnatchError};
use snatcher_responder::Responder;

/// Result of waiting for the reply to the last command.
#[derive(Debug)]
pub enum Awaited {
    /// A reply with the expected shape and no error marker.
    Valid(Reply),
    /// No reply, a rejected reply, or a responder fault.
    Failed(SnatchError),
    /// An operator interrupt arrived first. The poll window is kept, so
    /// waiting again resumes where it stopped.
    Interrupted(EngineInput),
}

/// One command in flight at a time against a [`Responder`].
pub struct ResponderSession {
    responder: Box<dyn Responder>,
    config: SessionConfig,
    polls_used: u32,
    inputs_closed: bool,
}

impl ResponderSession {
    pub fn new(responder: Box<dyn Responder>, config: SessionConfig) -> Self {
        Self {
            responder,
            config,
            polls_used: 0,
            inputs_closed: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Discards replies still queued from earlier commands, sends `command`
    /// and waits the settle time.
    pub async fn send(&mut self, command: &str) -> Result<(), SnatchError> {
        loop {
            match self.responder.poll().await {
                Ok(Some(stale)) => {
                    debug!("Discarding stale reply with {} unit(s)", stale.len());
                }
                Ok(None) => break,
                Err(e) => return Err(SnatchError::Responder(e.to_string())),
            }
        }

        self.responder
            .send(command)
            .await
            .map_err(|e| SnatchError::Responder(e.to_string()))?;
        self.polls_used = 0;

        if !self.config.settle.is_zero() {
            task::sleep(self.config.settle).await;
        }
        Ok(())
    }

    /// Polls for the reply to the last command, watching `inputs` for
    /// operator interrupts in between polls.
    pub async fn await_reply(
        &mut self,
        shape: ReplyShape,
        inputs: &mut mpsc::Receiver<EngineInput>,
    ) -> Awaited {
        loop {
            match self.responder.poll().await {
                // an empty payload is still being filled in
                Ok(Some(reply)) if !reply.is_empty() => return classify(reply, shape),
                Ok(_) => {}
                Err(e) => return Awaited::Failed(SnatchError::Responder(e.to_string())),
            }

            if self.polls_used >= self.config.poll_attempts {
                return Awaited::Failed(SnatchError::NoReply {
                    attempts: self.polls_used,
                });
            }

            if self.inputs_closed {
                task::sleep(self.config.poll_interval).await;
                self.polls_used += 1;
                continue;
            }

            match timeout(self.config.poll_interval, inputs.next()).await {
                Ok(Some(input)) => return Awaited::Interrupted(input),
                Ok(None) => {
                    warn!("Operator input closed; interrupts are no longer available");
                    self.inputs_closed = true;
                }
                Err(_) => self.polls_used += 1,
            }
        }
    }
}

/// Checks a reply for the responder's error marker, then for the expected
/// unit count.
pub fn classify(reply: Reply, shape: ReplyShape) -> Awaited {
    if let Some(message) = reply.error_message() {
        return Awaited::Failed(SnatchError::ExplicitError(message));
    }
    if !shape.accepts(reply.len()) {
        return Awaited::Failed(SnatchError::UnexpectedShape {
            expected: shape,
            actual: reply.len(),
        });
    }
    Awaited::Valid(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snatcher_core::ReplyUnit;
    use snatcher_responder::{Script, ScriptedResponder};
    use std::time::Duration;

    fn fast() -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(5),
            poll_attempts: 3,
            settle: Duration::ZERO,
        }
    }

    fn units(n: usize) -> Reply {
        Reply::new(vec![ReplyUnit::new().with_field("Audio:", "x"); n])
    }

    #[test]
    fn test_classify_error_marker_wins_over_shape() {
        let reply = Reply::new(vec![ReplyUnit::new().with_field("Error", "no such map")]);
        match classify(reply, ReplyShape::Exactly(3)) {
            Awaited::Failed(SnatchError::ExplicitError(msg)) => assert_eq!(msg, "no such map"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_shape() {
        assert!(matches!(
            classify(units(2), ReplyShape::Exactly(3)),
            Awaited::Failed(SnatchError::UnexpectedShape { actual: 2, .. })
        ));
        assert!(matches!(
            classify(units(4), ReplyShape::AtLeast(3)),
            Awaited::Valid(_)
        ));
    }

    #[async_std::test]
    async fn test_no_reply_after_poll_attempts() {
        let responder = ScriptedResponder::new(vec![Script::Silence]);
        let mut session = ResponderSession::new(Box::new(responder), fast());
        let (_tx, mut rx) = mpsc::channel(1);

        session.send("/nohud codename:Koi").await.unwrap();
        match session.await_reply(ReplyShape::Any, &mut rx).await {
            Awaited::Failed(SnatchError::NoReply { attempts }) => assert_eq!(attempts, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[async_std::test]
    async fn test_empty_reply_keeps_polling() {
        let responder = ScriptedResponder::new(vec![Script::Reply(Reply::default())]);
        let mut session = ResponderSession::new(Box::new(responder), fast());
        let (_tx, mut rx) = mpsc::channel(1);

        session.send("/a").await.unwrap();
        assert!(matches!(
            session.await_reply(ReplyShape::Any, &mut rx).await,
            Awaited::Failed(SnatchError::NoReply { .. })
        ));
    }

    #[async_std::test]
    async fn test_interrupt_resumes_same_window() {
        let responder = ScriptedResponder::new(vec![Script::Delayed {
            reply: units(1),
            polls: 2,
        }]);
        let mut session = ResponderSession::new(Box::new(responder), fast());
        let (mut tx, mut rx) = mpsc::channel(1);

        session.send("/a").await.unwrap();
        tx.try_send(EngineInput::Info).unwrap();
        assert!(matches!(
            session.await_reply(ReplyShape::Any, &mut rx).await,
            Awaited::Interrupted(EngineInput::Info)
        ));
        assert!(matches!(
            session.await_reply(ReplyShape::Any, &mut rx).await,
            Awaited::Valid(_)
        ));
    }
}

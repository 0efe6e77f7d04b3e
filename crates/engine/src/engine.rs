use crate::processor::{Interpretation, ItemProcessor};
use crate::queue::RequestQueue;
use crate::session::{Awaited, ResponderSession};
use futures::channel::mpsc;
use futures::sink::SinkExt;
use futures::{select, FutureExt, StreamExt};
use log::{debug, info, warn};
use snatcher_core::{EngineInput, EngineOutput, RetryPolicy, RunSummary, SnatchError};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingReply,
    Processing,
    Done,
}

/// Outcome of a single [`AcquisitionEngine::cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Continue,
    Finished,
    Stopped,
}

/// Drives the head of the queue through request, reply and processing
/// until the queue is empty or the operator stops it.
///
/// Every item either succeeds or is dropped once its failure budget runs
/// out, so the queue always shrinks.
pub struct AcquisitionEngine<P: ItemProcessor> {
    processor: P,
    queue: RequestQueue<P::Item>,
    session: ResponderSession,
    policy: RetryPolicy,
    state: EngineState,
    failures: u32,
    sends: u32,
    current: Option<P::Item>,
    /// Interrupts received while a batch was downloading, applied next cycle.
    deferred: VecDeque<EngineInput>,
    summary: RunSummary,
}

impl<P: ItemProcessor> AcquisitionEngine<P> {
    pub fn new(
        processor: P,
        queue: RequestQueue<P::Item>,
        session: ResponderSession,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            processor,
            queue,
            session,
            policy,
            state: EngineState::Idle,
            failures: 0,
            sends: 0,
            current: None,
            deferred: VecDeque::new(),
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Failures charged to the current head item.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn queue(&self) -> &RequestQueue<P::Item> {
        &self.queue
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs cycles until the queue is exhausted or a stop arrives.
    pub async fn run(
        mut self,
        mut input_rx: mpsc::Receiver<EngineInput>,
        mut output_tx: mpsc::Sender<EngineOutput>,
    ) -> RunSummary {
        info!(
            "[{}] Starting with {} item(s) queued",
            self.processor.name(),
            self.queue.count()
        );
        loop {
            match self.cycle(&mut input_rx, &mut output_tx).await {
                Cycle::Continue => continue,
                Cycle::Finished | Cycle::Stopped => return self.summary,
            }
        }
    }

    /// One pass of the state machine: send the head's command, wait for a
    /// reply, and act on the outcome.
    pub async fn cycle(
        &mut self,
        input_rx: &mut mpsc::Receiver<EngineInput>,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        if self.state == EngineState::Done {
            return if self.summary.stopped {
                Cycle::Stopped
            } else {
                Cycle::Finished
            };
        }

        // interrupts typed while the previous item was downloading
        while let Some(input) = self
            .deferred
            .pop_front()
            .or_else(|| input_rx.try_recv().ok())
        {
            if let Some(outcome) = self.interrupt(input, output_tx).await {
                return outcome;
            }
        }

        let head = match self.queue.peek() {
            Ok(head) => head.clone(),
            Err(_) => {
                self.state = EngineState::Done;
                info!(
                    "[{}] Queue exhausted: {} succeeded, {} dropped, {} skipped",
                    self.processor.name(),
                    self.summary.succeeded,
                    self.summary.dropped,
                    self.summary.skipped
                );
                emit(output_tx, EngineOutput::Finished(self.summary)).await;
                return Cycle::Finished;
            }
        };
        self.track_head(&head);

        let command = self.processor.encode_request(&head);
        self.sends += 1;
        info!("[{}] Sending '{}' for {}", self.processor.name(), command, head);
        emit(
            output_tx,
            EngineOutput::Sent {
                item: head.to_string(),
                command: command.clone(),
                attempt: self.sends,
            },
        )
        .await;

        if let Err(e) = self.session.send(&command).await {
            return self.fail(&head, e, output_tx).await;
        }
        self.state = EngineState::AwaitingReply;

        let shape = self.processor.expected_shape(&head);
        let reply = loop {
            match self.session.await_reply(shape, input_rx).await {
                Awaited::Valid(reply) => break reply,
                Awaited::Failed(e) => return self.fail(&head, e, output_tx).await,
                Awaited::Interrupted(input) => {
                    if let Some(outcome) = self.interrupt(input, output_tx).await {
                        return outcome;
                    }
                }
            }
        };

        self.state = EngineState::Processing;
        let outcome = match self.processor.interpret_reply(&head, &reply) {
            Interpretation::Pending => {
                debug!("[{}] {} needs another step", self.processor.name(), head);
                self.state = EngineState::Idle;
                return Cycle::Continue;
            }
            Interpretation::Unparseable(reason) => Err(SnatchError::Unparseable(reason)),
            Interpretation::Complete(data) => {
                match self.process_watching(data, &head, input_rx, output_tx).await {
                    Some(outcome) => outcome,
                    None => {
                        warn!(
                            "[{}] Abandoning downloads for {}",
                            self.processor.name(),
                            head
                        );
                        return self.stop(output_tx).await;
                    }
                }
            }
        };

        match outcome {
            Ok(()) => self.succeed(&head, output_tx).await,
            Err(e) => self.fail(&head, e, output_tx).await,
        }
    }

    /// Runs the processor's batch while listening for interrupts. `None`
    /// means a stop arrived and the batch was cancelled. `info` is answered
    /// at once; other interrupts wait for the batch to finish.
    async fn process_watching(
        &mut self,
        data: P::Data,
        head: &P::Item,
        input_rx: &mut mpsc::Receiver<EngineInput>,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Option<Result<(), SnatchError>> {
        let mut work = self.processor.process(data, head).fuse();
        loop {
            select! {
                outcome = work => return Some(outcome),
                input = input_rx.next() => match input {
                    Some(EngineInput::Stop) => return None,
                    Some(EngineInput::Info) => {
                        let remaining = self.queue.count();
                        info!(
                            "[{}] Downloading {}, {} remaining, {} failure(s)",
                            self.processor.name(),
                            head,
                            remaining,
                            self.failures
                        );
                        emit(
                            output_tx,
                            EngineOutput::Info {
                                current: Some(head.to_string()),
                                remaining,
                                failures: self.failures,
                            },
                        )
                        .await;
                    }
                    Some(other) => {
                        debug!("Holding {:?} until {} finishes downloading", other, head);
                        self.deferred.push_back(other);
                    }
                    None => return Some(work.await),
                },
            }
        }
    }

    fn track_head(&mut self, head: &P::Item) {
        if self.current.as_ref() != Some(head) {
            self.processor.reset();
            self.failures = 0;
            self.sends = 0;
            self.current = Some(head.clone());
        }
    }

    /// Clears per-item state after the head leaves the queue.
    fn release_head(&mut self) -> Option<P::Item> {
        if !self.deferred.is_empty() {
            debug!("Discarding {} interrupt(s) for the finished item", self.deferred.len());
            self.deferred.clear();
        }
        self.processor.reset();
        self.failures = 0;
        self.sends = 0;
        self.current = None;
        self.state = EngineState::Idle;
        self.queue.dequeue()
    }

    async fn succeed(
        &mut self,
        head: &P::Item,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        info!("[{}] {} done", self.processor.name(), head);
        self.release_head();
        self.summary.succeeded += 1;
        emit(
            output_tx,
            EngineOutput::Succeeded {
                item: head.to_string(),
            },
        )
        .await;
        Cycle::Continue
    }

    /// Charges `error` to the head item against the budget its kind
    /// belongs to.
    async fn fail(
        &mut self,
        head: &P::Item,
        error: SnatchError,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        if error.is_command_failure() {
            self.command_failure(head, error, output_tx).await
        } else {
            self.processing_failure(head, error, output_tx).await
        }
    }

    async fn command_failure(
        &mut self,
        head: &P::Item,
        error: SnatchError,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        self.failures += 1;
        let budget = self.policy.max_command_send_retries;
        if self.failures > budget {
            return self.drop_head(head, error, output_tx).await;
        }
        self.retry(head, error, budget, output_tx).await
    }

    async fn processing_failure(
        &mut self,
        head: &P::Item,
        error: SnatchError,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        self.failures += 1;
        self.processor.reset();
        let budget = self.policy.max_retries_per_item;
        if self.failures >= budget {
            return self.drop_head(head, error, output_tx).await;
        }
        self.retry(head, error, budget, output_tx).await
    }

    async fn retry(
        &mut self,
        head: &P::Item,
        error: SnatchError,
        budget: u32,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        warn!(
            "[{}] {} failed ({}/{}): {}; resending",
            self.processor.name(),
            head,
            self.failures,
            budget,
            error
        );
        self.state = EngineState::Idle;
        emit(
            output_tx,
            EngineOutput::Retrying {
                item: head.to_string(),
                reason: error.to_string(),
                failures: self.failures,
                budget,
            },
        )
        .await;
        Cycle::Continue
    }

    async fn drop_head(
        &mut self,
        head: &P::Item,
        error: SnatchError,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Cycle {
        warn!(
            "[{}] Dropping {} after {} failure(s): {}",
            self.processor.name(),
            head,
            self.failures,
            error
        );
        self.release_head();
        self.summary.dropped += 1;
        emit(
            output_tx,
            EngineOutput::Dropped {
                item: head.to_string(),
                reason: error.to_string(),
            },
        )
        .await;
        Cycle::Continue
    }

    async fn stop(&mut self, output_tx: &mut mpsc::Sender<EngineOutput>) -> Cycle {
        info!("[{}] Stop requested", self.processor.name());
        self.state = EngineState::Done;
        self.summary.stopped = true;
        emit(output_tx, EngineOutput::Stopped(self.summary)).await;
        Cycle::Stopped
    }

    /// Applies an operator interrupt. `None` means carry on with whatever
    /// was in progress.
    async fn interrupt(
        &mut self,
        input: EngineInput,
        output_tx: &mut mpsc::Sender<EngineOutput>,
    ) -> Option<Cycle> {
        match input {
            EngineInput::Info => {
                let current = self.queue.peek().ok().map(ToString::to_string);
                info!(
                    "[{}] Current: {}, {} remaining, {} failure(s)",
                    self.processor.name(),
                    current.as_deref().unwrap_or("-"),
                    self.queue.count(),
                    self.failures
                );
                emit(
                    output_tx,
                    EngineOutput::Info {
                        current,
                        remaining: self.queue.count(),
                        failures: self.failures,
                    },
                )
                .await;
                None
            }
            EngineInput::Skip => {
                let Some(skipped) = self.release_head() else {
                    emit(output_tx, EngineOutput::Notice("nothing to skip".into())).await;
                    return None;
                };
                let next = self.queue.peek().ok().map(ToString::to_string);
                info!("[{}] Skipped {}", self.processor.name(), skipped);
                self.summary.skipped += 1;
                emit(
                    output_tx,
                    EngineOutput::Skipped {
                        item: skipped.to_string(),
                        next,
                    },
                )
                .await;
                Some(Cycle::Continue)
            }
            EngineInput::Stop => Some(self.stop(output_tx).await),
            EngineInput::Redo => {
                if !self.processor.supports_redo() {
                    emit(
                        output_tx,
                        EngineOutput::Notice(format!(
                            "{} does not support redo",
                            self.processor.name()
                        )),
                    )
                    .await;
                    return None;
                }
                info!("[{}] Redo requested; resending", self.processor.name());
                self.failures = 0;
                self.state = EngineState::Idle;
                Some(Cycle::Continue)
            }
        }
    }
}

async fn emit(output_tx: &mut mpsc::Sender<EngineOutput>, event: EngineOutput) {
    // nobody listening is fine
    let _ = output_tx.send(event).await;
}

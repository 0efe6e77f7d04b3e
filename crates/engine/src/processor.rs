use async_trait::async_trait;
use snatcher_core::{Reply, ReplyShape, RetryPolicy, SnatchError};
use std::fmt;

/// What a processor made of a reply.
#[derive(Debug)]
pub enum Interpretation<D> {
    /// Everything needed to process the item.
    Complete(D),
    /// The reply was consumed into the processor's own state; the engine
    /// should send the next step's command for the same item.
    Pending,
    Unparseable(String),
}

/// One acquisition scenario: how to ask for an item, how to read the
/// answer, and what to download.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    type Item: Clone + PartialEq + fmt::Display + Send + Sync;
    type Data: Send;

    fn name(&self) -> &str;

    fn default_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Command text for the item's current step.
    fn encode_request(&self, item: &Self::Item) -> String;

    fn expected_shape(&self, item: &Self::Item) -> ReplyShape;

    fn interpret_reply(&mut self, item: &Self::Item, reply: &Reply)
        -> Interpretation<Self::Data>;

    /// Validates `data`, downloads, and records completion.
    async fn process(&self, data: Self::Data, item: &Self::Item) -> Result<(), SnatchError>;

    /// Forget per-item progress. Called when the head item changes and
    /// after a processing failure.
    fn reset(&mut self) {}

    fn supports_redo(&self) -> bool {
        false
    }
}

/// Position within a fixed sequence of request steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCursor {
    step: usize,
    steps: usize,
}

impl StepCursor {
    pub fn new(steps: usize) -> Self {
        Self {
            step: 0,
            steps: steps.max(1),
        }
    }

    pub fn current(&self) -> usize {
        self.step
    }

    pub fn is_last(&self) -> bool {
        self.step + 1 >= self.steps
    }

    /// Moves to the next step. Returns false when already on the last one.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.step += 1;
        true
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }
}

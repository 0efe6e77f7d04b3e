use serde::{Deserialize, Serialize};
use std::fmt;

/// One named value inside a reply unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
}

/// A discrete group of fields within a reply (one embed, one card...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<ReplyField>,
}

impl ReplyUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Field names are matched case-insensitively.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }
}

/// A complete reply payload from the responder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub units: Vec<ReplyUnit>,
}

impl Reply {
    pub fn new(units: Vec<ReplyUnit>) -> Self {
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit(&self, index: usize) -> Option<&ReplyUnit> {
        self.units.get(index)
    }

    /// The responder flags its own failures with an `Error` field in the
    /// first unit.
    pub fn error_message(&self) -> Option<String> {
        self.units
            .first()
            .and_then(|u| u.field("Error"))
            .map(|msg| msg.trim().to_string())
    }
}

/// How many units a processor expects in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyShape {
    /// Any nonzero count.
    Any,
    Exactly(usize),
    AtLeast(usize),
}

impl ReplyShape {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            ReplyShape::Any => count > 0,
            ReplyShape::Exactly(n) => count == n,
            ReplyShape::AtLeast(n) => count >= n.max(1),
        }
    }
}

impl fmt::Display for ReplyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyShape::Any => write!(f, "one or more"),
            ReplyShape::Exactly(n) => write!(f, "exactly {}", n),
            ReplyShape::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Interrupts an operator can send to a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineInput {
    Skip,
    Stop,
    Info,
    Redo,
}

impl EngineInput {
    /// Parses an operator word such as `skip` or `!stop`.
    pub fn parse(word: &str) -> Option<Self> {
        let word = word.trim().to_ascii_lowercase();
        match word.strip_prefix('!').unwrap_or(&word) {
            "skip" => Some(EngineInput::Skip),
            "stop" => Some(EngineInput::Stop),
            "info" => Some(EngineInput::Info),
            "redo" | "retry" => Some(EngineInput::Redo),
            _ => None,
        }
    }
}

/// Totals for one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub stopped: bool,
}

/// Progress events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineOutput {
    /// A command went out for the head item.
    Sent {
        item: String,
        command: String,
        attempt: u32,
    },
    Succeeded {
        item: String,
    },
    /// The head item failed and its command will be resent.
    Retrying {
        item: String,
        reason: String,
        failures: u32,
        budget: u32,
    },
    /// The head item exhausted its budget and was removed.
    Dropped {
        item: String,
        reason: String,
    },
    Skipped {
        item: String,
        next: Option<String>,
    },
    Info {
        current: Option<String>,
        remaining: usize,
        failures: u32,
    },
    /// Catch-all for operator-facing notices (ignored redo, empty queue...).
    Notice(String),
    Finished(RunSummary),
    Stopped(RunSummary),
}

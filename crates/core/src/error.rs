use crate::protocol::ReplyShape;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the acquisition pipeline can report.
///
/// The first group mirrors the outcomes the engine's state machine reacts
/// to; the rest is plumbing that gets folded into one of those paths.
#[derive(Debug, Error)]
pub enum SnatchError {
    #[error("no reply within {attempts} poll attempts")]
    NoReply { attempts: u32 },

    #[error("expected {expected} reply units, got {actual}")]
    UnexpectedShape { expected: ReplyShape, actual: usize },

    #[error("responder reported an error: {0}")]
    ExplicitError(String),

    #[error("missing required fields: {}", .0.join(", "))]
    FieldMissing(Vec<String>),

    #[error("download of {url} failed after {attempts} attempt(s): {reason}")]
    DownloadFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("could not interpret reply: {0}")]
    Unparseable(String),

    #[error("responder failure: {0}")]
    Responder(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SnatchError {
    /// Whether the engine charges this failure to the command-send budget
    /// (the request never produced a usable reply) rather than the
    /// per-item processing budget.
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            SnatchError::NoReply { .. }
                | SnatchError::UnexpectedShape { .. }
                | SnatchError::ExplicitError(_)
                | SnatchError::Responder(_)
        )
    }

    pub fn field_missing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SnatchError::FieldMissing(names.into_iter().map(Into::into).collect())
    }
}

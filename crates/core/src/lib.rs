//! # snatcher-core
//!
//! Shared vocabulary for the snatcher workspace: the reply/command protocol
//! spoken between the acquisition engine and its responder, the error
//! taxonomy every crate reports through, and the configuration types.

pub mod error;
pub mod manifest;
pub mod protocol;
pub mod settings;

pub use error::SnatchError;
pub use manifest::{FetchConfig, RetryPolicy, SessionConfig};
pub use protocol::{EngineInput, EngineOutput, Reply, ReplyField, ReplyShape, ReplyUnit, RunSummary};
pub use settings::Settings;

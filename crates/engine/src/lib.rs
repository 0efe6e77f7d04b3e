//! # snatcher-engine
//!
//! The acquisition loop: a FIFO of work items, a session that trades one
//! command for one reply with the responder, a table-driven reply parser,
//! and the retry/skip state machine that ties them to a pluggable
//! [`ItemProcessor`].

pub mod engine;
pub mod parser;
pub mod processor;
pub mod queue;
pub mod session;

pub use engine::{AcquisitionEngine, Cycle, EngineState};
pub use parser::{clean_value, parse, parse_unit, FieldMap, ParseReport, Slot};
pub use processor::{Interpretation, ItemProcessor, StepCursor};
pub use queue::{EmptyQueue, RequestQueue};
pub use session::{Awaited, ResponderSession};

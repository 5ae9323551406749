//! Observability module
//!
//! Logging and structured event infrastructure for monitoring `choicelab`
//! sessions while an experiment runs.

pub mod events;
pub mod logging;

pub use events::{EventEmitter, SessionEvent};
pub use logging::{LogFormat, init_logging};

//! `choicelab` - Trial orchestration for binary-choice behavioral experiments
//!
//! This library provides components for running sessions of binary-choice
//! allocation trials with interleaved attention tests: event sequencing,
//! a per-event phase state machine, run scheduling with breaks, and CSV
//! response logging.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod pool;
pub mod present;
pub mod responses;
pub mod sequence;
pub mod session;
pub mod text;

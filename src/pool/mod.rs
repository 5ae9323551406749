//! Trial and attention-test pools
//!
//! Read-only event payloads loaded once at startup: [`TrialPool`] holds the
//! monetary-allocation records parsed from a tabular source, and
//! [`AttentionTestSet`] is the fixed known-answer catalog used to probe
//! participant engagement.

pub mod attention;
pub mod trials;

pub use attention::{AttentionTestRecord, AttentionTestSet, Choice};
pub use trials::{LoadOutcome, RowWarning, TrialPool, TrialRecord};

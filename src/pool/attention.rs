//! Attention test catalog.
//!
//! A fixed, known-answer set of probe events used to detect inattentive
//! responding. Each record's allocation pattern is engineered so exactly one
//! option is unambiguously better (self-payoff or joint dominance), and the
//! expected answer is precomputed per record rather than derived at runtime
//! from the magnitudes. This is a static catalog, not a generator.

use serde::Serialize;

use super::trials::TrialRecord;

/// One of the two mutually exclusive response options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Choice {
    /// Option A.
    A,
    /// Option B.
    B,
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// A trial record with a known-correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttentionTestRecord {
    /// The allocation magnitudes shown to the participant.
    pub trial: TrialRecord,
    /// The answer an attentive participant is expected to give.
    pub correct_answer: Choice,
}

impl AttentionTestRecord {
    /// Whether a captured choice matches the expected answer.
    ///
    /// Correctness is scored by this comparison downstream; the orchestrator
    /// never branches on it.
    #[must_use]
    pub fn is_correct(&self, choice: Choice) -> bool {
        choice == self.correct_answer
    }
}

/// The fixed catalog of attention tests.
#[derive(Debug, Clone, Default)]
pub struct AttentionTestSet {
    records: Vec<AttentionTestRecord>,
}

impl AttentionTestSet {
    /// The built-in catalog of five probes.
    ///
    /// Answers are fixed by design; see the dominance sanity test below.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            records: vec![
                AttentionTestRecord {
                    trial: TrialRecord::new(10.0, 5.0, 5.0, 5.0),
                    correct_answer: Choice::A,
                },
                AttentionTestRecord {
                    trial: TrialRecord::new(2.0, 2.0, 9.0, 9.0),
                    correct_answer: Choice::B,
                },
                AttentionTestRecord {
                    trial: TrialRecord::new(8.0, 8.0, 8.0, 1.0),
                    correct_answer: Choice::A,
                },
                AttentionTestRecord {
                    trial: TrialRecord::new(1.0, 10.0, 7.0, 10.0),
                    correct_answer: Choice::B,
                },
                AttentionTestRecord {
                    trial: TrialRecord::new(12.0, 12.0, 3.0, 2.0),
                    correct_answer: Choice::A,
                },
            ],
        }
    }

    /// An empty set, for configurations with attention tests disabled.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Builds a set from explicit records (tests).
    #[must_use]
    pub const fn from_records(records: Vec<AttentionTestRecord>) -> Self {
        Self { records }
    }

    /// The record at `index`, if within the set.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AttentionTestRecord> {
        self.records.get(index)
    }

    /// All records in catalog order.
    #[must_use]
    pub fn records(&self) -> &[AttentionTestRecord] {
        &self.records
    }

    /// Number of records in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

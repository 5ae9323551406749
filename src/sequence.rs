//! Event sequencing.
//!
//! Merges the trial pool and the attention-test set into one ordered list of
//! [`EventSlot`]s, choosing where attention tests are interleaved. Placement
//! is randomized but constrained: the first test lands near the start of the
//! sequence and subsequent tests follow at gaps of 4 to 7 events. The walk is
//! index-based over the combined sequence, so every placed test shifts later
//! trials one position; [`adjusted_trial_index`] recovers the position into
//! the original trial list from the final index set alone.

use rand::Rng;
use serde::Serialize;

use crate::pool::{AttentionTestSet, TrialPool};

/// Earliest/latest bound for the first attention test (clamped to the pool).
const FIRST_TEST_MIN: usize = 4;
const FIRST_TEST_MAX: usize = 7;
/// Gap bounds between consecutive attention tests.
const STEP_MIN: usize = 4;
const STEP_MAX: usize = 7;

/// What a slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A regular trial; the payload is recovered at run time through
    /// [`adjusted_trial_index`].
    Regular,
    /// An attention test referring into the catalog.
    Attention {
        /// Index into the attention-test set, in placement order.
        test_index: usize,
    },
}

/// One position in the sequenced experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventSlot {
    /// 0-based, sequence-wide index; unique and contiguous.
    pub event_index: usize,
    /// What this slot refers to.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The sequencer's output: the slot list plus placement bookkeeping.
#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    /// Slots in run order; `slots[i].event_index == i`.
    pub slots: Vec<EventSlot>,
    /// Indices of attention slots, ascending. Derivable from `slots`; kept
    /// so index adjustment does not rescan the list per event.
    pub attention_indices: Vec<usize>,
    /// Attention tests available in the catalog.
    pub configured_tests: usize,
    /// Attention tests actually placed.
    pub placed_tests: usize,
}

impl SequenceOutcome {
    /// Number of events in the final sequence.
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.slots.len()
    }

    /// Whether placement ran out of index space before placing every test.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.placed_tests < self.configured_tests
    }
}

/// Builds the ordered event sequence from the two pools.
///
/// Placement: the first test index is drawn uniformly from
/// `[min(4, trials), min(7, trials)]`; each later test follows at a uniform
/// gap in `[4, 7]`. A candidate index that is already used advances by one
/// and retries without counting as a placement. Placement stops once the
/// next candidate would leave a regular slot with no trial to fill it; any
/// unplaced tests are dropped (the caller surfaces this as a non-fatal
/// warning). Every remaining index is filled, in order, by the next unused
/// trial.
///
/// With no trials at all, tests occupy the leading indices verbatim; with
/// nothing in either pool the sequence is empty.
pub fn sequence<R: Rng + ?Sized>(
    trials: &TrialPool,
    tests: &AttentionTestSet,
    rng: &mut R,
) -> SequenceOutcome {
    let n_trials = trials.len();
    let n_tests = tests.len();

    if n_trials + n_tests == 0 {
        return SequenceOutcome {
            slots: Vec::new(),
            attention_indices: Vec::new(),
            configured_tests: 0,
            placed_tests: 0,
        };
    }

    let attention_indices = if n_trials == 0 {
        (0..n_tests).collect()
    } else {
        place_attention_indices(n_trials, n_tests, rng)
    };

    let placed = attention_indices.len();
    let total = n_trials + placed;

    let mut slots = Vec::with_capacity(total);
    let mut next_attention = 0;
    for event_index in 0..total {
        let kind = if attention_indices.get(next_attention) == Some(&event_index) {
            next_attention += 1;
            EventKind::Attention {
                test_index: next_attention - 1,
            }
        } else {
            EventKind::Regular
        };
        slots.push(EventSlot { event_index, kind });
    }

    SequenceOutcome {
        slots,
        attention_indices,
        configured_tests: n_tests,
        placed_tests: placed,
    }
}

/// Walks the combined index space placing attention tests.
///
/// A placement at index `i` with `k` tests already placed is valid only
/// while `i <= n_trials + k`; past that point the regular slots below `i`
/// outnumber the available trials and the remaining tests are dropped.
fn place_attention_indices<R: Rng + ?Sized>(
    n_trials: usize,
    n_tests: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut indices: Vec<usize> = Vec::with_capacity(n_tests);
    if n_tests == 0 {
        return indices;
    }

    let lo = FIRST_TEST_MIN.min(n_trials);
    let hi = FIRST_TEST_MAX.min(n_trials);
    let mut idx = rng.random_range(lo..=hi);

    while indices.len() < n_tests {
        if indices.contains(&idx) {
            // Collision: advance by one and retry, not a placement.
            idx += 1;
            continue;
        }
        if idx > n_trials + indices.len() {
            break;
        }
        indices.push(idx);
        if indices.len() == n_tests {
            break;
        }
        idx += rng.random_range(STEP_MIN..=STEP_MAX);
    }

    indices
}

/// Recovers the trial-list position for a regular event index.
///
/// Counts attention indices strictly below `event_index`; a test sitting at
/// exactly `event_index` does not offset itself. Depends only on the final
/// index set, not on how placement was done.
#[must_use]
pub fn adjusted_trial_index(event_index: usize, attention_indices: &[usize]) -> usize {
    let preceding = attention_indices
        .iter()
        .filter(|&&t| t < event_index)
        .count();
    event_index - preceding
}

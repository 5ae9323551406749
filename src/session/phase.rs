//! Phase identities and per-phase timing draws.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;

/// The orchestrator's per-event state machine, forward-only:
/// `Idle -> Onset -> Decision -> Confirmation -> Fixation`, then the next
/// event (or done).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No event is being processed.
    Idle,
    /// Stimulus shown, inputs disabled, fixed duration.
    Onset,
    /// Inputs enabled; blocks without timeout until a choice registers.
    Decision,
    /// Inputs disabled again; uniform-random duration.
    Confirmation,
    /// Neutral glyph; uniform-random duration.
    Fixation,
}

impl Phase {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Onset => "onset",
            Self::Decision => "decision",
            Self::Confirmation => "confirmation",
            Self::Fixation => "fixation",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configured timing bounds for the timed phases, in seconds.
///
/// Validation keeps every bound non-negative and each `min <= max` before a
/// session is built, so the draw methods never see an invalid range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTimings {
    /// Fixed onset duration.
    pub onset_secs: f64,
    /// Confirmation bounds, drawn uniformly per event.
    pub confirmation_min_secs: f64,
    pub confirmation_max_secs: f64,
    /// Fixation bounds, drawn uniformly per event.
    pub fixation_min_secs: f64,
    pub fixation_max_secs: f64,
    /// Fixed rest length between runs.
    pub inter_run_secs: f64,
}

impl PhaseTimings {
    #[must_use]
    pub fn onset(&self) -> Duration {
        Duration::from_secs_f64(self.onset_secs)
    }

    /// Draws this event's confirmation duration.
    pub fn draw_confirmation<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(
            rng.random_range(self.confirmation_min_secs..=self.confirmation_max_secs),
        )
    }

    /// Draws this event's fixation duration.
    pub fn draw_fixation<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.random_range(self.fixation_min_secs..=self.fixation_max_secs))
    }

    #[must_use]
    pub fn inter_run(&self) -> Duration {
        Duration::from_secs_f64(self.inter_run_secs)
    }
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            onset_secs: 2.0,
            confirmation_min_secs: 1.0,
            confirmation_max_secs: 2.0,
            fixation_min_secs: 0.5,
            fixation_max_secs: 1.5,
            inter_run_secs: 30.0,
        }
    }
}

//! Run partitioning.
//!
//! A run is a contiguous window of events; rest breaks sit between
//! consecutive runs and never after the last one. The plan is derived
//! arithmetic over the sequenced event count, not a stored structure.

use std::ops::Range;

/// Computed partition of the event sequence into runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    total_events: usize,
    events_per_run: usize,
    clamped: bool,
}

impl RunPlan {
    /// Builds the plan from the sequenced event count and the configured
    /// run size.
    ///
    /// A non-positive configured size is a recoverable misconfiguration:
    /// it is clamped so the whole sequence runs as one run, and
    /// [`RunPlan::was_clamped`] reports it for the caller to warn about.
    #[must_use]
    pub fn new(total_events: usize, configured_events_per_run: i64) -> Self {
        let (events_per_run, clamped) = if configured_events_per_run <= 0 {
            (total_events.max(1), true)
        } else {
            (
                usize::try_from(configured_events_per_run).unwrap_or(usize::MAX),
                false,
            )
        };
        Self {
            total_events,
            events_per_run,
            clamped,
        }
    }

    #[must_use]
    pub const fn total_events(&self) -> usize {
        self.total_events
    }

    #[must_use]
    pub const fn events_per_run(&self) -> usize {
        self.events_per_run
    }

    #[must_use]
    pub const fn was_clamped(&self) -> bool {
        self.clamped
    }

    /// Number of runs in the partition; zero only for an empty sequence.
    #[must_use]
    pub const fn total_runs(&self) -> usize {
        self.total_events.div_ceil(self.events_per_run)
    }

    /// Event-index window of the given 0-based run; the final window may be
    /// shorter than `events_per_run`.
    #[must_use]
    pub fn run_span(&self, run: usize) -> Range<usize> {
        let start = (run * self.events_per_run).min(self.total_events);
        let end = (start + self.events_per_run).min(self.total_events);
        start..end
    }

    /// Iterates the run windows in order.
    pub fn runs(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.total_runs()).map(|run| self.run_span(run))
    }

    /// Whether a rest break follows the given 0-based run.
    #[must_use]
    pub const fn has_break_after(&self, run: usize) -> bool {
        run + 1 < self.total_runs()
    }
}

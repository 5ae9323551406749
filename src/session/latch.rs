//! One-shot decision capture.
//!
//! During a decision phase the shared latch has exactly one writer at a
//! time by construction: the orchestrator arms it at phase entry, at most
//! one input registers, and everything after the first registration is
//! ignored until the latch is armed again for the next event. Near-
//! simultaneous inputs race on an atomic compare-exchange, so the first
//! write wins rather than the last.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::pool::Choice;

/// The winning input for one decision phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedDecision {
    /// The registered option.
    pub choice: Choice,
    /// When the registration landed, on the runtime clock.
    pub at: Instant,
}

/// One-shot, re-armable input latch.
#[derive(Debug, Default)]
pub struct DecisionLatch {
    armed: AtomicBool,
    decided: AtomicBool,
    // Held only for a plain store or copy-out, never across .await points.
    captured: Mutex<Option<CapturedDecision>>,
    notify: Notify,
}

impl DecisionLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the latch for a new decision phase, discarding any previous
    /// capture.
    pub fn arm(&self) {
        *self.captured.lock().expect("decision latch lock poisoned") = None;
        self.decided.store(false, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Closes the latch; further inputs are dropped until the next `arm`.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Attempts to register an input.
    ///
    /// Returns `true` only for the first registration of an armed phase;
    /// inputs while disarmed, and any registration after the first, return
    /// `false` and leave the capture untouched.
    pub fn register(&self, choice: Choice) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return false;
        }
        if self
            .decided
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let captured = CapturedDecision {
            choice,
            at: Instant::now(),
        };
        *self.captured.lock().expect("decision latch lock poisoned") = Some(captured);
        self.notify.notify_one();
        true
    }

    /// The capture for the current phase, if one has landed.
    #[must_use]
    pub fn captured(&self) -> Option<CapturedDecision> {
        *self.captured.lock().expect("decision latch lock poisoned")
    }

    /// Waits until a registration lands for the current phase.
    pub async fn wait(&self) -> CapturedDecision {
        loop {
            let notified = self.notify.notified();
            if let Some(decision) = self.captured() {
                return decision;
            }
            notified.await;
        }
    }
}

/// Cloneable registration handle given to presentation collaborators.
///
/// Collaborators push inputs through this; they never see the latch's
/// internals or the orchestrator's state.
#[derive(Debug, Clone)]
pub struct ParticipantHandle {
    latch: Arc<DecisionLatch>,
}

impl ParticipantHandle {
    #[must_use]
    pub fn new(latch: Arc<DecisionLatch>) -> Self {
        Self { latch }
    }

    /// Registers a choice; returns whether it was the winning input.
    pub fn register(&self, choice: Choice) -> bool {
        self.latch.register(choice)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn input_while_disarmed_is_dropped() {
        let latch = DecisionLatch::new();
        assert!(!latch.register(Choice::A));
        assert!(latch.captured().is_none());
    }

    #[test]
    fn first_registration_wins() {
        let latch = DecisionLatch::new();
        latch.arm();

        assert!(latch.register(Choice::A));
        assert!(!latch.register(Choice::B));

        let captured = latch.captured().unwrap();
        assert_eq!(captured.choice, Choice::A);
    }

    #[test]
    fn rearm_discards_previous_capture() {
        let latch = DecisionLatch::new();
        latch.arm();
        assert!(latch.register(Choice::A));

        latch.arm();
        assert!(latch.captured().is_none());
        assert!(latch.register(Choice::B));
        assert_eq!(latch.captured().unwrap().choice, Choice::B);
    }

    #[test]
    fn disarm_blocks_late_input() {
        let latch = DecisionLatch::new();
        latch.arm();
        latch.disarm();
        assert!(!latch.register(Choice::B));
        assert!(latch.captured().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_registration_that_raced_ahead() {
        let latch = DecisionLatch::new();
        latch.arm();
        latch.register(Choice::B);

        let captured = latch.wait().await;
        assert_eq!(captured.choice, Choice::B);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_wakes_on_later_registration() {
        let latch = Arc::new(DecisionLatch::new());
        latch.arm();

        let responder = Arc::clone(&latch);
        let entry = Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            responder.register(Choice::A);
        });

        let captured = latch.wait().await;
        assert_eq!(captured.choice, Choice::A);
        assert_eq!(captured.at.duration_since(entry), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_routes_to_latch() {
        let latch = Arc::new(DecisionLatch::new());
        let handle = ParticipantHandle::new(Arc::clone(&latch));
        latch.arm();

        assert!(handle.register(Choice::A));
        assert!(!handle.clone().register(Choice::B));
        assert_eq!(latch.wait().await.choice, Choice::A);
    }
}

//! Scripted participant for unattended runs.
//!
//! Wraps another presenter and, whenever a frame enables inputs, schedules
//! a registration through the [`ParticipantHandle`] after a fixed delay.
//! This drives a full session end to end with nobody at the keyboard, which
//! is how timing and logging changes get exercised before a lab session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use crate::pool::Choice;
use crate::present::{Frame, Presenter};
use crate::session::ParticipantHandle;

/// How the scripted participant picks its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponsePolicy {
    /// Always register option A.
    AlwaysA,
    /// Always register option B.
    AlwaysB,
    /// Alternate between A and B, starting with A.
    Alternate,
    /// Draw uniformly per event from a seeded generator.
    Random,
}

/// Presenter wrapper that answers every decision phase.
pub struct SimulatedParticipant {
    inner: Arc<dyn Presenter>,
    handle: ParticipantHandle,
    policy: ResponsePolicy,
    delay: Duration,
    flip: AtomicBool,
    // Brief lock for one bool draw, never held across .await points.
    rng: Mutex<StdRng>,
}

impl SimulatedParticipant {
    #[must_use]
    pub fn new(
        inner: Arc<dyn Presenter>,
        handle: ParticipantHandle,
        policy: ResponsePolicy,
        delay: Duration,
        seed: u64,
    ) -> Self {
        Self {
            inner,
            handle,
            policy,
            delay,
            flip: AtomicBool::new(false),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next_choice(&self) -> Choice {
        match self.policy {
            ResponsePolicy::AlwaysA => Choice::A,
            ResponsePolicy::AlwaysB => Choice::B,
            ResponsePolicy::Alternate => {
                if self.flip.fetch_xor(true, Ordering::SeqCst) {
                    Choice::B
                } else {
                    Choice::A
                }
            }
            ResponsePolicy::Random => {
                let heads = self
                    .rng
                    .lock()
                    .expect("simulated participant rng lock poisoned")
                    .random_bool(0.5);
                if heads { Choice::A } else { Choice::B }
            }
        }
    }
}

#[async_trait::async_trait]
impl Presenter for SimulatedParticipant {
    async fn present(&self, frame: Frame) {
        if matches!(
            frame,
            Frame::Stimulus {
                inputs_enabled: true,
                ..
            }
        ) {
            let choice = self.next_choice();
            let handle = self.handle.clone();
            let delay = self.delay;
            debug!(%choice, delay_ms = delay.as_millis(), "scheduling simulated response");
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                handle.register(choice);
            });
        }
        self.inner.present(frame).await;
    }
}

impl std::fmt::Debug for SimulatedParticipant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedParticipant")
            .field("policy", &self.policy)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::{NullPresenter, StimulusView};
    use crate::session::DecisionLatch;

    fn stimulus(inputs_enabled: bool) -> Frame {
        Frame::Stimulus {
            view: StimulusView {
                prompt: "?".to_string(),
                option_a_label: "A".to_string(),
                option_b_label: "B".to_string(),
                magnitudes: [1.0, 2.0, 3.0, 4.0],
            },
            inputs_enabled,
        }
    }

    fn participant(latch: &Arc<DecisionLatch>, policy: ResponsePolicy) -> SimulatedParticipant {
        SimulatedParticipant::new(
            Arc::new(NullPresenter),
            ParticipantHandle::new(Arc::clone(latch)),
            policy,
            Duration::from_millis(250),
            7,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn answers_when_inputs_enable() {
        let latch = Arc::new(DecisionLatch::new());
        let sim = participant(&latch, ResponsePolicy::AlwaysB);

        latch.arm();
        sim.present(stimulus(true)).await;

        let captured = latch.wait().await;
        assert_eq!(captured.choice, Choice::B);
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_disabled_stimulus() {
        let latch = Arc::new(DecisionLatch::new());
        let sim = participant(&latch, ResponsePolicy::AlwaysA);

        latch.arm();
        sim.present(stimulus(false)).await;
        sim.present(Frame::Blank).await;

        // Give any stray responder time to fire before checking.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(latch.captured().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn alternate_policy_flips_per_decision() {
        let latch = Arc::new(DecisionLatch::new());
        let sim = participant(&latch, ResponsePolicy::Alternate);

        latch.arm();
        sim.present(stimulus(true)).await;
        assert_eq!(latch.wait().await.choice, Choice::A);

        latch.arm();
        sim.present(stimulus(true)).await;
        assert_eq!(latch.wait().await.choice, Choice::B);

        latch.arm();
        sim.present(stimulus(true)).await;
        assert_eq!(latch.wait().await.choice, Choice::A);
    }

    #[tokio::test(start_paused = true)]
    async fn random_policy_is_seed_deterministic() {
        let run = |seed: u64| async move {
            let latch = Arc::new(DecisionLatch::new());
            let sim = SimulatedParticipant::new(
                Arc::new(NullPresenter),
                ParticipantHandle::new(Arc::clone(&latch)),
                ResponsePolicy::Random,
                Duration::from_millis(10),
                seed,
            );
            let mut choices = Vec::new();
            for _ in 0..8 {
                latch.arm();
                sim.present(stimulus(true)).await;
                choices.push(latch.wait().await.choice);
            }
            choices
        };

        assert_eq!(run(42).await, run(42).await);
    }
}

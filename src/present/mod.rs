//! Presentation collaborators.
//!
//! The orchestrator never talks to a screen directly. Each phase computes a
//! [`Frame`] — a pure projection of what the participant should currently
//! see — and hands it to a [`Presenter`]. Interaction state needed for
//! correctness (the decision latch, timing) never lives on this side of the
//! boundary; presenters only render frames and push inputs back through a
//! [`ParticipantHandle`](crate::session::ParticipantHandle).

pub mod simulated;

use tracing::{debug, info};

pub use simulated::{ResponsePolicy, SimulatedParticipant};

use crate::pool::Choice;

/// The stimulus content for one event, fully resolved: localized labels
/// plus the four allocation magnitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusView {
    /// Question shown above the stimulus.
    pub prompt: String,
    /// Label for option A.
    pub option_a_label: String,
    /// Label for option B.
    pub option_b_label: String,
    /// `[a_self, a_other, b_self, b_other]`, in display order.
    pub magnitudes: [f64; 4],
}

/// What the participant should currently see.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Nothing; all experiment surfaces hidden.
    Blank,
    /// The stimulus, with inputs enabled only during the decision phase.
    Stimulus {
        view: StimulusView,
        inputs_enabled: bool,
    },
    /// The stimulus with the captured choice highlighted, inputs disabled.
    Confirmation { view: StimulusView, choice: Choice },
    /// The neutral fixation glyph.
    Fixation { glyph: String },
    /// Inter-run rest screen.
    Break { message: String, seconds: f64 },
    /// End-of-session screen.
    Complete { message: String },
}

/// Renders frames. No business logic lives behind this trait.
#[async_trait::async_trait]
pub trait Presenter: Send + Sync {
    /// Replaces whatever is currently shown with `frame`.
    async fn present(&self, frame: Frame);
}

/// Presenter that discards every frame. Used when the engine runs headless
/// and in tests that only care about the record stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

#[async_trait::async_trait]
impl Presenter for NullPresenter {
    async fn present(&self, _frame: Frame) {}
}

/// Presenter that narrates frames into the tracing log, one line each.
/// This is the default surface for terminal runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPresenter;

#[async_trait::async_trait]
impl Presenter for TracingPresenter {
    async fn present(&self, frame: Frame) {
        match frame {
            Frame::Blank => debug!("frame: blank"),
            Frame::Stimulus {
                view,
                inputs_enabled,
            } => debug!(
                prompt = %view.prompt,
                a = %view.option_a_label,
                b = %view.option_b_label,
                magnitudes = ?view.magnitudes,
                inputs_enabled,
                "frame: stimulus"
            ),
            Frame::Confirmation { choice, .. } => debug!(%choice, "frame: confirmation"),
            Frame::Fixation { glyph } => debug!(%glyph, "frame: fixation"),
            Frame::Break { message, seconds } => info!(%message, seconds, "frame: break"),
            Frame::Complete { message } => info!(%message, "frame: complete"),
        }
    }
}

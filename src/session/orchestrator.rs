//! Per-event state machine.
//!
//! Drives one [`EventSlot`] at a time through
//! `Onset -> Decision -> Confirmation -> Fixation`. Events never overlap:
//! the driver is strictly sequential, so the decision latch and the
//! currently displayed stimulus have exactly one writer at a time by
//! construction.
//!
//! Localized strings are awaited before a phase's content is finalized and
//! each phase timer starts only after the lookups resolve, so a slow lookup
//! extends the phase rather than truncating it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::observability::{EventEmitter, SessionEvent};
use crate::pool::{AttentionTestSet, TrialPool, TrialRecord};
use crate::present::{Frame, Presenter, StimulusView};
use crate::responses::{ResponseChoice, ResponseRecord};
use crate::sequence::{EventKind, EventSlot, adjusted_trial_index};
use crate::session::latch::DecisionLatch;
use crate::session::phase::{Phase, PhaseTimings};
use crate::text::{ATTENTION_TABLE, Localizer, UI_TABLE, keys, task_table};

/// `TaskTypeOrEvent` value logged for attention-test events.
pub const ATTENTION_EVENT_LABEL: &str = "AttentionTest";

// ============================================================================
// EventOutcome
// ============================================================================

/// What happened to one slot. Every variant carries the record that must be
/// appended to the response log, placeholders included.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// All four phases ran and a decision was captured.
    Completed(ResponseRecord),
    /// The slot could not be resolved; a placeholder was recorded and no
    /// phase ran.
    Skipped(ResponseRecord),
    /// Cancellation landed mid-event. The record is the real capture when
    /// the decision had already been made, otherwise a `None` response.
    Interrupted(ResponseRecord),
}

impl EventOutcome {
    #[must_use]
    pub const fn record(&self) -> &ResponseRecord {
        match self {
            Self::Completed(r) | Self::Skipped(r) | Self::Interrupted(r) => r,
        }
    }

    #[must_use]
    pub fn into_record(self) -> ResponseRecord {
        match self {
            Self::Completed(r) | Self::Skipped(r) | Self::Interrupted(r) => r,
        }
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Everything the orchestrator needs, bundled so construction sites stay
/// readable.
pub struct OrchestratorSetup {
    /// Operator-assigned participant identifier.
    pub participant_id: String,
    /// Task-type label; names the localization table and the log column.
    pub task_label: String,
    /// Phase timing bounds.
    pub timings: PhaseTimings,
    /// Shuffled trial pool.
    pub trials: Arc<TrialPool>,
    /// Attention-test catalog.
    pub tests: Arc<AttentionTestSet>,
    /// Attention slot indices from sequencing, ascending.
    pub attention_indices: Vec<usize>,
    /// Shared decision latch; collaborators register through a handle to
    /// the same latch.
    pub latch: Arc<DecisionLatch>,
    /// Frame sink.
    pub presenter: Arc<dyn Presenter>,
    /// String source.
    pub localizer: Arc<dyn Localizer>,
    /// Structured event sink.
    pub emitter: Arc<EventEmitter>,
    /// End-of-session signal; checked at every suspension point.
    pub cancel: CancellationToken,
    /// Source for per-event duration draws.
    pub rng: StdRng,
}

// ============================================================================
// TrialOrchestrator
// ============================================================================

/// Sequential driver for the per-event phase machine.
pub struct TrialOrchestrator {
    participant_id: String,
    task_label: String,
    task_table: String,
    timings: PhaseTimings,
    trials: Arc<TrialPool>,
    tests: Arc<AttentionTestSet>,
    attention_indices: Vec<usize>,
    latch: Arc<DecisionLatch>,
    presenter: Arc<dyn Presenter>,
    localizer: Arc<dyn Localizer>,
    emitter: Arc<EventEmitter>,
    cancel: CancellationToken,
    rng: StdRng,
    epoch: Instant,
}

impl TrialOrchestrator {
    /// Builds the driver; the session clock (for `AbsoluteTime`) starts
    /// here.
    #[must_use]
    pub fn new(setup: OrchestratorSetup) -> Self {
        let task_table = task_table(&setup.task_label);
        Self {
            participant_id: setup.participant_id,
            task_label: setup.task_label,
            task_table,
            timings: setup.timings,
            trials: setup.trials,
            tests: setup.tests,
            attention_indices: setup.attention_indices,
            latch: setup.latch,
            presenter: setup.presenter,
            localizer: setup.localizer,
            emitter: setup.emitter,
            cancel: setup.cancel,
            rng: setup.rng,
            epoch: Instant::now(),
        }
    }

    /// Runs one slot through the phase machine and returns its record.
    ///
    /// An unresolvable slot short-circuits to a placeholder record without
    /// running any phase, preserving the one-record-per-event invariant.
    pub async fn run_event(&mut self, slot: EventSlot) -> EventOutcome {
        let event_number = slot.event_index + 1;

        let Some((trial, label, table)) = self.resolve(slot) else {
            let label = match slot.kind {
                EventKind::Attention { .. } => ATTENTION_EVENT_LABEL.to_string(),
                EventKind::Regular => self.task_label.clone(),
            };
            let record = self.record(
                event_number,
                &label,
                ResponseChoice::Skipped,
                0.0,
                None,
                Instant::now(),
            );
            return EventOutcome::Skipped(record);
        };

        // ONSET. Labels resolve before the timer starts.
        let prompt = self.localizer.get_string(&table, keys::PROMPT).await;
        let option_a_label = self.localizer.get_string(&table, keys::OPTION_A).await;
        let option_b_label = self.localizer.get_string(&table, keys::OPTION_B).await;
        let view = StimulusView {
            prompt,
            option_a_label,
            option_b_label,
            magnitudes: trial.magnitudes(),
        };
        self.enter_phase(event_number, Phase::Onset);
        self.presenter
            .present(Frame::Stimulus {
                view: view.clone(),
                inputs_enabled: false,
            })
            .await;
        if !self.pause(self.timings.onset()).await {
            return EventOutcome::Interrupted(self.none_record(event_number, &label, &trial));
        }

        // DECISION. Blocks without timeout until the first registration.
        self.latch.arm();
        let decision_start = Instant::now();
        self.enter_phase(event_number, Phase::Decision);
        self.presenter
            .present(Frame::Stimulus {
                view: view.clone(),
                inputs_enabled: true,
            })
            .await;
        let captured = tokio::select! {
            captured = self.latch.wait() => captured,
            () = self.cancel.cancelled() => {
                self.latch.disarm();
                return EventOutcome::Interrupted(self.none_record(event_number, &label, &trial));
            }
        };
        self.latch.disarm();

        let reaction_secs = captured.at.duration_since(decision_start).as_secs_f64();
        let record = self.record(
            event_number,
            &label,
            ResponseChoice::Chosen(captured.choice),
            reaction_secs,
            Some(trial.magnitudes()),
            captured.at,
        );
        self.emitter.emit(SessionEvent::DecisionCaptured {
            timestamp: Utc::now(),
            event_number,
            event_label: label.clone(),
            choice: captured.choice.to_string(),
            reaction_secs,
        });
        info!(
            event = event_number,
            choice = %captured.choice,
            reaction_secs,
            "decision captured"
        );

        // CONFIRMATION.
        self.enter_phase(event_number, Phase::Confirmation);
        self.presenter
            .present(Frame::Confirmation {
                view: view.clone(),
                choice: captured.choice,
            })
            .await;
        let confirmation = self.timings.draw_confirmation(&mut self.rng);
        if !self.pause(confirmation).await {
            return EventOutcome::Interrupted(record);
        }

        // FIXATION.
        let glyph = self.localizer.get_string(UI_TABLE, keys::FIXATION).await;
        self.enter_phase(event_number, Phase::Fixation);
        self.presenter.present(Frame::Fixation { glyph }).await;
        let fixation = self.timings.draw_fixation(&mut self.rng);
        if !self.pause(fixation).await {
            return EventOutcome::Interrupted(record);
        }

        EventOutcome::Completed(record)
    }

    /// Maps a slot to its stimulus and labels; `None` means the slot is
    /// unresolvable and must be logged as a placeholder.
    fn resolve(&self, slot: EventSlot) -> Option<(TrialRecord, String, String)> {
        match slot.kind {
            EventKind::Attention { test_index } => match self.tests.get(test_index) {
                Some(test) => Some((
                    test.trial,
                    ATTENTION_EVENT_LABEL.to_string(),
                    ATTENTION_TABLE.to_string(),
                )),
                None => {
                    self.resolution_failed(slot.event_index, test_index, self.tests.len());
                    None
                }
            },
            EventKind::Regular => {
                let trial_index = adjusted_trial_index(slot.event_index, &self.attention_indices);
                match self.trials.get(trial_index) {
                    Some(trial) => {
                        Some((*trial, self.task_label.clone(), self.task_table.clone()))
                    }
                    None => {
                        self.resolution_failed(slot.event_index, trial_index, self.trials.len());
                        None
                    }
                }
            }
        }
    }

    fn resolution_failed(&self, event_index: usize, trial_index: usize, pool_len: usize) {
        error!(
            event_index,
            trial_index, pool_len, "slot does not map to underlying data; logging placeholder"
        );
        self.emitter.emit(SessionEvent::SlotResolutionFailed {
            timestamp: Utc::now(),
            event_index,
            trial_index,
            pool_len,
        });
    }

    fn enter_phase(&self, event_number: usize, phase: Phase) {
        debug!(event = event_number, %phase, "phase entered");
        self.emitter.emit(SessionEvent::PhaseEntered {
            timestamp: Utc::now(),
            event_number,
            phase: phase.name().to_string(),
        });
    }

    /// Sleeps unless cancellation lands first; returns whether the full
    /// duration elapsed.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.cancel.cancelled() => false,
        }
    }

    fn none_record(&self, event_number: usize, label: &str, trial: &TrialRecord) -> ResponseRecord {
        self.record(
            event_number,
            label,
            ResponseChoice::None,
            0.0,
            Some(trial.magnitudes()),
            Instant::now(),
        )
    }

    fn record(
        &self,
        event_number: usize,
        label: &str,
        choice: ResponseChoice,
        reaction_secs: f64,
        bar_data: Option<[f64; 4]>,
        at: Instant,
    ) -> ResponseRecord {
        ResponseRecord {
            participant_id: self.participant_id.clone(),
            event_number,
            absolute_secs: at.duration_since(self.epoch).as_secs_f64(),
            event_label: label.to_string(),
            choice,
            reaction_secs,
            bar_data,
        }
    }
}

impl std::fmt::Debug for TrialOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialOrchestrator")
            .field("participant_id", &self.participant_id)
            .field("task_label", &self.task_label)
            .field("attention_indices", &self.attention_indices)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

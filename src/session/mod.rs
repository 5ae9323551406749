//! Session assembly and run loop.
//!
//! [`Session::prepare`] resolves everything random or file-backed up front
//! (seed, trial pool, attention placement, run plan) so a session can be
//! inspected before it runs; [`Session::run`] then drives the orchestrator
//! through every run, handles inter-run breaks, and flushes the response
//! log exactly once at the end, interruption included.

mod latch;
mod orchestrator;
mod phase;
mod runs;

pub use latch::{CapturedDecision, DecisionLatch, ParticipantHandle};
pub use orchestrator::{
    ATTENTION_EVENT_LABEL, EventOutcome, OrchestratorSetup, TrialOrchestrator,
};
pub use phase::{Phase, PhaseTimings};
pub use runs::RunPlan;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{ExperimentConfig, TimingConfig};
use crate::error::{ChoiceLabError, SessionError};
use crate::observability::{EventEmitter, SessionEvent};
use crate::pool::{AttentionTestSet, TrialPool};
use crate::present::{Frame, Presenter};
use crate::responses::{ResponseChoice, ResponseLog};
use crate::sequence::{EventKind, SequenceOutcome};
use crate::text::{CatalogLocalizer, Localizer, StringCatalog, UI_TABLE, keys};

impl From<&TimingConfig> for PhaseTimings {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            onset_secs: timing.onset_secs,
            confirmation_min_secs: timing.confirmation_min_secs,
            confirmation_max_secs: timing.confirmation_max_secs,
            fixation_min_secs: timing.fixation_min_secs,
            fixation_max_secs: timing.fixation_max_secs,
            inter_run_secs: timing.inter_run_secs,
        }
    }
}

// ============================================================================
// Options and summaries
// ============================================================================

/// Everything a session needs, grouped to keep the constructor readable.
pub struct SessionOptions {
    /// Parsed experiment configuration.
    pub config: Arc<ExperimentConfig>,
    /// Localized string tables.
    pub catalog: StringCatalog,
    /// Decision latch shared with whatever registers participant input.
    pub latch: Arc<DecisionLatch>,
    /// Frame sink.
    pub presenter: Arc<dyn Presenter>,
    /// Structured event sink.
    pub emitter: Arc<EventEmitter>,
    /// Token for cooperative shutdown.
    pub cancel: CancellationToken,
    /// Overrides `output.directory` from the configuration when set.
    pub output_dir: Option<PathBuf>,
}

/// Resolved shape of a prepared session, for inspection before running.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPlan {
    pub seed: u64,
    pub participant_id: String,
    pub task_type: String,
    pub trial_count: usize,
    pub configured_tests: usize,
    pub placed_tests: usize,
    pub truncated: bool,
    pub total_events: usize,
    pub events_per_run: usize,
    pub total_runs: usize,
    pub breaks: usize,
    pub attention_indices: Vec<usize>,
}

/// What a finished session reports back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub participant_id: String,
    pub task_type: String,
    pub seed: u64,
    pub total_events: usize,
    pub completed_events: usize,
    pub placeholder_events: usize,
    pub total_runs: usize,
    pub attention_correct: usize,
    pub attention_total: usize,
    pub responses_path: PathBuf,
}

// ============================================================================
// Session
// ============================================================================

/// A fully resolved experiment session, ready to run once.
pub struct Session {
    config: Arc<ExperimentConfig>,
    localizer: Arc<dyn Localizer>,
    trials: Arc<TrialPool>,
    tests: Arc<AttentionTestSet>,
    outcome: SequenceOutcome,
    plan: RunPlan,
    seed: u64,
    rng: StdRng,
    latch: Arc<DecisionLatch>,
    presenter: Arc<dyn Presenter>,
    emitter: Arc<EventEmitter>,
    cancel: CancellationToken,
    output_dir: PathBuf,
    timings: PhaseTimings,
}

impl Session {
    /// Resolves the seed, loads and shuffles the trial pool, places the
    /// attention tests, and splits the sequence into runs.
    ///
    /// Source problems degrade rather than fail: an unreadable trial file
    /// leaves the pool empty and the session continues on whatever event
    /// sources remain. Emptiness is checked in [`Session::run`] so that
    /// even a zero-event session still produces a header-only log.
    #[must_use]
    pub fn prepare(opts: SessionOptions) -> Self {
        let seed = opts.config.experiment.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        info!(seed, "seeding session rng");

        let mut trials = load_trials(&opts.config, &opts.emitter);
        trials.shuffle(&mut rng);
        let tests = if opts.config.attention.enabled {
            AttentionTestSet::builtin()
        } else {
            AttentionTestSet::empty()
        };

        let outcome = crate::sequence::sequence(&trials, &tests, &mut rng);
        if outcome.truncated() {
            warn!(
                placed = outcome.placed_tests,
                configured = outcome.configured_tests,
                "sequence bounds truncated the attention tests"
            );
            opts.emitter.emit(SessionEvent::SequenceTruncated {
                timestamp: Utc::now(),
                placed: outcome.placed_tests,
                configured: outcome.configured_tests,
            });
        }

        let plan = RunPlan::new(outcome.total_events(), opts.config.runs.events_per_run);
        if plan.was_clamped() {
            warn!(
                events_per_run = opts.config.runs.events_per_run,
                "non-positive events-per-run; running the whole sequence as one run"
            );
        }

        let localizer: Arc<dyn Localizer> = Arc::new(CatalogLocalizer::new(
            opts.catalog,
            Arc::clone(&opts.emitter),
        ));
        let timings = PhaseTimings::from(&opts.config.timing);
        let output_dir = opts
            .output_dir
            .unwrap_or_else(|| opts.config.output.directory.clone());

        Self {
            config: opts.config,
            localizer,
            trials: Arc::new(trials),
            tests: Arc::new(tests),
            outcome,
            plan,
            seed,
            rng,
            latch: opts.latch,
            presenter: opts.presenter,
            emitter: opts.emitter,
            cancel: opts.cancel,
            output_dir,
            timings,
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn run_plan(&self) -> &RunPlan {
        &self.plan
    }

    #[must_use]
    pub const fn sequence_outcome(&self) -> &SequenceOutcome {
        &self.outcome
    }

    /// Snapshot of the resolved session shape.
    #[must_use]
    pub fn describe(&self) -> SessionPlan {
        SessionPlan {
            seed: self.seed,
            participant_id: self.config.experiment.participant_id.clone(),
            task_type: self.config.experiment.task_type.clone(),
            trial_count: self.trials.len(),
            configured_tests: self.outcome.configured_tests,
            placed_tests: self.outcome.placed_tests,
            truncated: self.outcome.truncated(),
            total_events: self.plan.total_events(),
            events_per_run: self.plan.events_per_run(),
            total_runs: self.plan.total_runs(),
            breaks: self.plan.total_runs().saturating_sub(1),
            attention_indices: self.outcome.attention_indices.clone(),
        }
    }

    /// Runs every event, breaks included, and flushes the response log.
    ///
    /// The log is flushed exactly once, on every exit path; interruption
    /// flushes whatever was recorded before returning
    /// [`SessionError::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyExperiment`] when no event sources
    /// resolved, [`SessionError::Interrupted`] when cancellation cut the
    /// session short, or the flush error when the log could not be written.
    pub async fn run(self) -> Result<SessionSummary, ChoiceLabError> {
        let Self {
            config,
            localizer,
            trials,
            tests,
            outcome,
            plan,
            seed,
            rng,
            latch,
            presenter,
            emitter,
            cancel,
            output_dir,
            timings,
        } = self;
        let participant_id = config.experiment.participant_id.clone();
        let task_label = config.experiment.task_type.clone();

        emitter.emit(SessionEvent::SessionStarted {
            timestamp: Utc::now(),
            participant_id: participant_id.clone(),
            task_type: task_label.clone(),
            total_events: plan.total_events(),
            total_runs: plan.total_runs(),
        });
        info!(
            participant = %participant_id,
            task = %task_label,
            events = plan.total_events(),
            runs = plan.total_runs(),
            "session starting"
        );

        let mut log = ResponseLog::new();

        if plan.total_events() == 0 {
            error!("experiment resolves to zero events");
            let _ = flush_with_retry(&emitter, &log, &output_dir, &task_label);
            emitter.emit(SessionEvent::SessionCompleted {
                timestamp: Utc::now(),
                completed_events: 0,
                placeholder_events: 0,
                interrupted: false,
            });
            return Err(SessionError::EmptyExperiment.into());
        }

        let inter_run = timings.inter_run();
        let inter_run_secs = timings.inter_run_secs;
        let mut orchestrator = TrialOrchestrator::new(OrchestratorSetup {
            participant_id: participant_id.clone(),
            task_label: task_label.clone(),
            timings,
            trials,
            tests: Arc::clone(&tests),
            attention_indices: outcome.attention_indices.clone(),
            latch,
            presenter: Arc::clone(&presenter),
            localizer: Arc::clone(&localizer),
            emitter: Arc::clone(&emitter),
            cancel: cancel.clone(),
            rng,
        });

        let mut completed = 0usize;
        let mut placeholders = 0usize;
        let mut interrupted = false;

        'runs: for run in 0..plan.total_runs() {
            for index in plan.run_span(run) {
                match orchestrator.run_event(outcome.slots[index]).await {
                    EventOutcome::Completed(record) => {
                        log.append(record);
                        completed += 1;
                    }
                    EventOutcome::Skipped(record) => {
                        log.append(record);
                        placeholders += 1;
                    }
                    EventOutcome::Interrupted(record) => {
                        log.append(record);
                        interrupted = true;
                        info!("session interrupted; flushing what was recorded");
                        break 'runs;
                    }
                }
            }

            emitter.emit(SessionEvent::RunCompleted {
                timestamp: Utc::now(),
                run: run + 1,
                total_runs: plan.total_runs(),
            });
            info!(run = run + 1, total = plan.total_runs(), "run completed");

            if plan.has_break_after(run) {
                let message = localizer.get_string(UI_TABLE, keys::BREAK_MESSAGE).await;
                emitter.emit(SessionEvent::BreakStarted {
                    timestamp: Utc::now(),
                    after_run: run + 1,
                    duration_secs: inter_run_secs,
                });
                presenter
                    .present(Frame::Break {
                        message,
                        seconds: inter_run_secs,
                    })
                    .await;
                if pause(&cancel, inter_run).await {
                    emitter.emit(SessionEvent::BreakEnded {
                        timestamp: Utc::now(),
                        before_run: run + 2,
                    });
                } else {
                    interrupted = true;
                    break 'runs;
                }
            }
        }

        if !interrupted {
            let message = localizer.get_string(UI_TABLE, keys::SESSION_COMPLETE).await;
            presenter.present(Frame::Complete { message }).await;
        }

        let flushed = flush_with_retry(&emitter, &log, &output_dir, &task_label);
        emitter.emit(SessionEvent::SessionCompleted {
            timestamp: Utc::now(),
            completed_events: completed,
            placeholder_events: placeholders,
            interrupted,
        });

        if interrupted {
            return Err(SessionError::Interrupted.into());
        }
        let responses_path = flushed?;
        let (attention_correct, attention_total) = attention_score(&log, &outcome, &tests);
        Ok(SessionSummary {
            participant_id,
            task_type: task_label,
            seed,
            total_events: plan.total_events(),
            completed_events: completed,
            placeholder_events: placeholders,
            total_runs: plan.total_runs(),
            attention_correct,
            attention_total,
            responses_path,
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("seed", &self.seed)
            .field("total_events", &self.plan.total_events())
            .field("total_runs", &self.plan.total_runs())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn load_trials(config: &ExperimentConfig, emitter: &EventEmitter) -> TrialPool {
    let Some(path) = &config.experiment.trials else {
        return TrialPool::default();
    };
    match TrialPool::load(path) {
        Ok(loaded) => {
            for w in &loaded.warnings {
                warn!(line = w.line, reason = %w.message, "dropping malformed trial row");
            }
            if loaded.dropped > 0 {
                emitter.emit(SessionEvent::TrialRowsDropped {
                    timestamp: Utc::now(),
                    path: path.display().to_string(),
                    kept: loaded.pool.len(),
                    dropped: loaded.dropped,
                });
            }
            loaded.pool
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "trial source unreadable; continuing without regular trials"
            );
            emitter.emit(SessionEvent::TrialSourceDegraded {
                timestamp: Utc::now(),
                path: path.display().to_string(),
                reason: e.to_string(),
            });
            TrialPool::default()
        }
    }
}

/// Sleeps unless cancellation lands first; returns whether the full
/// duration elapsed.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = cancel.cancelled() => false,
    }
}

/// Writes the log once, retrying a single time with a fresh filename so a
/// transient collision or disk hiccup does not lose the session's data.
fn flush_with_retry(
    emitter: &EventEmitter,
    log: &ResponseLog,
    dir: &Path,
    task_label: &str,
) -> Result<PathBuf, ChoiceLabError> {
    match log.flush(dir, task_label) {
        Ok(path) => {
            note_flushed(emitter, &path, log.len());
            Ok(path)
        }
        Err(first) => {
            error!(error = %first, "response flush failed; retrying with a fresh filename");
            emitter.emit(SessionEvent::FlushFailed {
                timestamp: Utc::now(),
                path: dir.display().to_string(),
                reason: first.to_string(),
            });
            match log.flush(dir, task_label) {
                Ok(path) => {
                    note_flushed(emitter, &path, log.len());
                    Ok(path)
                }
                Err(second) => {
                    error!(error = %second, "response flush failed twice; giving up");
                    emitter.emit(SessionEvent::FlushFailed {
                        timestamp: Utc::now(),
                        path: dir.display().to_string(),
                        reason: second.to_string(),
                    });
                    Err(second)
                }
            }
        }
    }
}

fn note_flushed(emitter: &EventEmitter, path: &Path, records: usize) {
    info!(path = %path.display(), records, "responses flushed");
    emitter.emit(SessionEvent::ResponsesFlushed {
        timestamp: Utc::now(),
        path: path.display().to_string(),
        records,
    });
}

fn attention_score(
    log: &ResponseLog,
    outcome: &SequenceOutcome,
    tests: &AttentionTestSet,
) -> (usize, usize) {
    let mut correct = 0;
    for slot in &outcome.slots {
        let EventKind::Attention { test_index } = slot.kind else {
            continue;
        };
        let Some(test) = tests.get(test_index) else {
            continue;
        };
        if let Some(record) = log.records().get(slot.event_index) {
            if let ResponseChoice::Chosen(choice) = record.choice {
                if test.is_correct(choice) {
                    correct += 1;
                }
            }
        }
    }
    (correct, outcome.attention_indices.len())
}

// ============================================================================
// Tests
// ============================================================================

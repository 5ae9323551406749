//! `run` command handler.
//!
//! Loads the experiment sources, wires the presentation and input
//! collaborators together, and drives one session to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::args::RunArgs;
use crate::error::ChoiceLabError;
use crate::observability::EventEmitter;
use crate::present::{Presenter, SimulatedParticipant, TracingPresenter};
use crate::session::{DecisionLatch, ParticipantHandle, Session, SessionOptions, SessionSummary};

/// Run one experiment session.
///
/// # Errors
///
/// Returns a usage error if neither `--config` nor `--trials` is provided,
/// a config error if loading fails, or a session error if the run fails
/// or is interrupted.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), ChoiceLabError> {
    let (mut config, catalog) = super::resolve_sources(
        args.config.as_deref(),
        args.trials.as_deref(),
    )?;

    if let Some(ref participant) = args.participant {
        config.experiment.participant_id.clone_from(participant);
    }
    if let Some(ref task) = args.task {
        config.experiment.task_type.clone_from(task);
    }
    if let Some(seed) = args.seed {
        config.experiment.seed = Some(seed);
    }
    let config = Arc::new(config);

    let emitter = Arc::new(if let Some(ref path) = args.events_file {
        EventEmitter::from_file(path)?
    } else {
        EventEmitter::stderr()
    });

    let latch = Arc::new(DecisionLatch::new());
    let base: Arc<dyn Presenter> = Arc::new(TracingPresenter);
    let presenter: Arc<dyn Presenter> = match args.simulate {
        Some(policy) => {
            info!(?policy, delay_ms = args.simulate_delay_ms, "simulated participant enabled");
            Arc::new(SimulatedParticipant::new(
                base,
                ParticipantHandle::new(Arc::clone(&latch)),
                policy.into(),
                Duration::from_millis(args.simulate_delay_ms),
                config.experiment.seed.unwrap_or_else(rand::random),
            ))
        }
        None => base,
    };

    let session = Session::prepare(SessionOptions {
        config,
        catalog,
        latch,
        presenter,
        emitter,
        cancel,
        output_dir: args.output.clone(),
    });

    let summary = session.run().await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!(
        "session complete: {} of {} events recorded ({} placeholders, {} runs)",
        summary.completed_events,
        summary.total_events,
        summary.placeholder_events,
        summary.total_runs
    );
    if summary.attention_total > 0 {
        println!(
            "attention checks: {}/{} correct",
            summary.attention_correct, summary.attention_total
        );
    }
    println!("responses: {}", summary.responses_path.display());
}

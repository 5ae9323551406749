//! `plan` command handler.
//!
//! Resolves the same seed, pool, placement, and run structure a session
//! would use, then prints it instead of running. With an explicit
//! `--seed` the printed plan matches a later `run` exactly.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, PlanArgs};
use crate::error::ChoiceLabError;
use crate::observability::EventEmitter;
use crate::present::NullPresenter;
use crate::session::{DecisionLatch, Session, SessionOptions, SessionPlan};

/// Resolve and print the session shape without running it.
///
/// # Errors
///
/// Returns a usage error if neither `--config` nor `--trials` is provided,
/// or a config error if loading fails.
pub fn run(args: &PlanArgs) -> Result<(), ChoiceLabError> {
    let (mut config, catalog) = super::resolve_sources(
        args.config.as_deref(),
        args.trials.as_deref(),
    )?;
    if let Some(seed) = args.seed {
        config.experiment.seed = Some(seed);
    }

    let session = Session::prepare(SessionOptions {
        config: Arc::new(config),
        catalog,
        latch: Arc::new(DecisionLatch::new()),
        presenter: Arc::new(NullPresenter),
        emitter: Arc::new(EventEmitter::noop()),
        cancel: CancellationToken::new(),
        output_dir: None,
    });
    let plan = session.describe();

    match args.format {
        OutputFormat::Human => print_plan(&plan),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }

    Ok(())
}

fn print_plan(plan: &SessionPlan) {
    println!("participant: {}", plan.participant_id);
    println!("task: {}", plan.task_type);
    println!("seed: {}", plan.seed);
    println!("trials: {}", plan.trial_count);
    if plan.truncated {
        println!(
            "attention tests: {} of {} placed (sequence too short for the rest)",
            plan.placed_tests, plan.configured_tests
        );
    } else {
        println!("attention tests: {} placed", plan.placed_tests);
    }
    println!(
        "events: {} across {} runs of up to {} ({} breaks)",
        plan.total_events, plan.total_runs, plan.events_per_run, plan.breaks
    );
    if !plan.attention_indices.is_empty() {
        let indices: Vec<String> = plan
            .attention_indices
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("attention slots: {}", indices.join(", "));
    }
}

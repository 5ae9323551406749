//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod plan;
pub mod run;
pub mod validate;
pub mod version;

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::{Cli, Commands};
use crate::config::{
    AttentionConfig, ConfigLoader, ExperimentConfig, ExperimentMetadata, OutputConfig, RunConfig,
    TimingConfig,
};
use crate::error::ChoiceLabError;
use crate::text::StringCatalog;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), ChoiceLabError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Plan(args) => plan::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Task-type label used when quick-start mode has no explicit override.
const QUICK_START_TASK: &str = "Social";

/// Resolves the experiment sources shared by `run` and `plan`: a full
/// configuration file, or a bare trial CSV with defaults for everything
/// else.
fn resolve_sources(
    config: Option<&Path>,
    trials: Option<&Path>,
) -> Result<(ExperimentConfig, StringCatalog), ChoiceLabError> {
    if let Some(path) = config {
        info!(config = %path.display(), "loading configuration");
        let loader = ConfigLoader::with_defaults();
        let loaded = loader.load(path)?;

        for warning in &loaded.warnings {
            warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}", warning.message
            );
        }

        Ok(((*loaded.config).clone(), loaded.catalog))
    } else if let Some(path) = trials {
        info!(trials = %path.display(), "quick-start: trial source with defaults");
        let config = ExperimentConfig {
            experiment: ExperimentMetadata {
                task_type: QUICK_START_TASK.to_string(),
                participant_id: "anonymous".to_string(),
                trials: Some(path.to_path_buf()),
                seed: None,
            },
            timing: TimingConfig::default(),
            runs: RunConfig::default(),
            attention: AttentionConfig::default(),
            output: OutputConfig::default(),
            localization: None,
        };
        Ok((config, StringCatalog::builtin_english()))
    } else {
        Err(ChoiceLabError::Usage(
            "either --config or --trials is required".to_string(),
        ))
    }
}

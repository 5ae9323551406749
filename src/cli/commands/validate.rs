//! `validate` command handler.
//!
//! Runs the full configuration pipeline (parse, path resolution,
//! validation, catalog checks) on each file without starting a session.

use serde::Serialize;
use tracing::{info, warn};

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ChoiceLabError, ConfigError, Severity, ValidationIssue};

#[derive(Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    warnings: Vec<String>,
}

/// Validate configuration files without running a session.
///
/// # Errors
///
/// Returns a config error if any file fails to load or validate, or —
/// under `--strict` — if any file produced warnings.
pub fn run(args: &ValidateArgs) -> Result<(), ChoiceLabError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        info!(file = %path.display(), "validating configuration");
        let loaded = loader.load(path)?;

        let warnings: Vec<String> = loaded
            .warnings
            .iter()
            .map(|w| match &w.location {
                Some(location) => format!("{location}: {}", w.message),
                None => w.message.clone(),
            })
            .collect();
        for warning in &warnings {
            warn!(file = %path.display(), "{warning}");
        }

        if args.strict && !warnings.is_empty() {
            let issues = loaded
                .warnings
                .iter()
                .map(|w| ValidationIssue {
                    path: w.location.clone().unwrap_or_else(|| "<config>".to_string()),
                    message: w.message.clone(),
                    severity: Severity::Warning,
                })
                .collect();
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: issues,
            }
            .into());
        }

        reports.push(FileReport {
            file: path.display().to_string(),
            valid: true,
            warnings,
        });
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                if report.warnings.is_empty() {
                    println!("ok: {}", report.file);
                } else {
                    println!("ok: {} ({} warnings)", report.file, report.warnings.len());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    Ok(())
}

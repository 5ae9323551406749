//! Configuration validation.
//!
//! Semantic validation over a deserialized [`ExperimentConfig`], run after
//! parsing and before the session is built. Validation collects ALL issues
//! rather than stopping at the first, so an operator fixes a file in one
//! pass.

use crate::config::schema::ExperimentConfig;
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that prevent the configuration from being used.
    pub errors: Vec<ValidationIssue>,

    /// Issues the session recovers from (clamping, degraded text).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Experiment configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the collected issues.
    pub fn validate(&mut self, config: &ExperimentConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_metadata(config);
        self.validate_timing(config);
        self.validate_runs(config);
        self.validate_sources(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_metadata(&mut self, config: &ExperimentConfig) {
        if config.experiment.task_type.trim().is_empty() {
            self.add_error(
                "experiment.task_type",
                "task type is required and cannot be empty",
            );
        }

        if config.experiment.task_type.len() > 100 {
            self.add_warning(
                "experiment.task_type",
                "task type is unusually long (> 100 characters)",
            );
        }

        if config.experiment.participant_id.trim().is_empty() {
            self.add_error(
                "experiment.participant_id",
                "participant id cannot be empty",
            );
        }
    }

    fn validate_timing(&mut self, config: &ExperimentConfig) {
        let t = &config.timing;
        let fields = [
            ("timing.onset_secs", t.onset_secs),
            ("timing.confirmation_min_secs", t.confirmation_min_secs),
            ("timing.confirmation_max_secs", t.confirmation_max_secs),
            ("timing.fixation_min_secs", t.fixation_min_secs),
            ("timing.fixation_max_secs", t.fixation_max_secs),
            ("timing.inter_run_secs", t.inter_run_secs),
        ];
        for (path, value) in fields {
            if !value.is_finite() {
                self.add_error(path, "duration must be a finite number of seconds");
            } else if value < 0.0 {
                self.add_error(path, "duration cannot be negative");
            }
        }

        if t.confirmation_min_secs > t.confirmation_max_secs {
            self.add_error(
                "timing.confirmation_min_secs",
                "lower bound exceeds confirmation_max_secs",
            );
        }
        if t.fixation_min_secs > t.fixation_max_secs {
            self.add_error(
                "timing.fixation_min_secs",
                "lower bound exceeds fixation_max_secs",
            );
        }

        if t.onset_secs == 0.0 {
            self.add_warning(
                "timing.onset_secs",
                "zero onset shows the stimulus with no preview interval",
            );
        }
    }

    fn validate_runs(&mut self, config: &ExperimentConfig) {
        if config.runs.events_per_run <= 0 {
            self.add_warning(
                "runs.events_per_run",
                "non-positive value will be clamped so the whole sequence runs as one run",
            );
        }
    }

    fn validate_sources(&mut self, config: &ExperimentConfig) {
        if config.experiment.trials.is_none() && !config.attention.enabled {
            self.add_error(
                "experiment.trials",
                "no event sources: trials are absent and attention tests are disabled",
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

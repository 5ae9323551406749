//! Configuration schema types.
//!
//! These types are deserialized from YAML experiment files. Every section
//! except `experiment` is optional and falls back to the defaults below, so
//! a minimal file is just a task type and a trial source.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for one experiment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentConfig {
    /// Participant, task, and source metadata (required).
    pub experiment: ExperimentMetadata,

    /// Phase timing bounds, in seconds.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Run structure.
    #[serde(default)]
    pub runs: RunConfig,

    /// Attention-test interleaving.
    #[serde(default)]
    pub attention: AttentionConfig,

    /// Response-log destination.
    #[serde(default)]
    pub output: OutputConfig,

    /// String catalog override; the compiled-in English catalog is used
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localization: Option<LocalizationConfig>,
}

// ============================================================================
// Experiment Metadata
// ============================================================================

/// Identification and data sources for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentMetadata {
    /// Condition label (for example `Social`). Names the localization
    /// table, the response-log `TaskTypeOrEvent` column, and the output
    /// filename.
    pub task_type: String,

    /// Operator-assigned participant identifier.
    #[serde(default = "default_participant_id")]
    pub participant_id: String,

    /// Path to the trial CSV. Relative paths resolve against the
    /// configuration file's directory. When absent the trial pool is
    /// empty and only attention tests can run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trials: Option<PathBuf>,

    /// Seed for shuffling, sequencing, and phase-duration draws. A random
    /// seed is drawn (and logged) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_participant_id() -> String {
    "anonymous".to_string()
}

// ============================================================================
// Timing
// ============================================================================

/// Timing bounds for the timed phases, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimingConfig {
    /// Fixed stimulus-onset duration.
    #[serde(default = "default_onset_secs")]
    pub onset_secs: f64,

    /// Lower bound of the per-event confirmation draw.
    #[serde(default = "default_confirmation_min_secs")]
    pub confirmation_min_secs: f64,

    /// Upper bound of the per-event confirmation draw.
    #[serde(default = "default_confirmation_max_secs")]
    pub confirmation_max_secs: f64,

    /// Lower bound of the per-event fixation draw.
    #[serde(default = "default_fixation_min_secs")]
    pub fixation_min_secs: f64,

    /// Upper bound of the per-event fixation draw.
    #[serde(default = "default_fixation_max_secs")]
    pub fixation_max_secs: f64,

    /// Fixed rest length between runs.
    #[serde(default = "default_inter_run_secs")]
    pub inter_run_secs: f64,
}

const fn default_onset_secs() -> f64 {
    2.0
}
const fn default_confirmation_min_secs() -> f64 {
    1.0
}
const fn default_confirmation_max_secs() -> f64 {
    2.0
}
const fn default_fixation_min_secs() -> f64 {
    0.5
}
const fn default_fixation_max_secs() -> f64 {
    1.5
}
const fn default_inter_run_secs() -> f64 {
    30.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            onset_secs: default_onset_secs(),
            confirmation_min_secs: default_confirmation_min_secs(),
            confirmation_max_secs: default_confirmation_max_secs(),
            fixation_min_secs: default_fixation_min_secs(),
            fixation_max_secs: default_fixation_max_secs(),
            inter_run_secs: default_inter_run_secs(),
        }
    }
}

// ============================================================================
// Runs
// ============================================================================

/// Run structure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunConfig {
    /// Events per run. A non-positive value is clamped at session start so
    /// the whole sequence runs as one run.
    #[serde(default = "default_events_per_run")]
    pub events_per_run: i64,
}

const fn default_events_per_run() -> i64 {
    20
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            events_per_run: default_events_per_run(),
        }
    }
}

// ============================================================================
// Attention Tests
// ============================================================================

/// Attention-test interleaving.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttentionConfig {
    /// Whether the built-in known-answer probes are interleaved.
    #[serde(default = "default_attention_enabled")]
    pub enabled: bool,
}

const fn default_attention_enabled() -> bool {
    true
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            enabled: default_attention_enabled(),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// Response-log destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    /// Directory the response CSV is written into; created on demand.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./results")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

// ============================================================================
// Localization
// ============================================================================

/// String catalog override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocalizationConfig {
    /// Path to a YAML file of `table -> key -> string`. Relative paths
    /// resolve against the configuration file's directory.
    pub strings: PathBuf,
}

//! CLI argument definitions.
//!
//! All Clap derive structs for `choicelab` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;
use crate::present::ResponsePolicy;

// ============================================================================
// Root CLI
// ============================================================================

/// Trial orchestration for binary-choice behavioral experiments.
#[derive(Parser, Debug)]
#[command(name = "choicelab", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "CHOICELAB_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "CHOICELAB_LOG_FORMAT"
    )]
    pub log_format: LogFormatArg,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an experiment session.
    Run(RunArgs),

    /// Validate configuration files without running a session.
    Validate(ValidateArgs),

    /// Resolve a session's event sequence and run structure without
    /// running it.
    Plan(PlanArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Run Command
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("source").multiple(false))]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, group = "source", env = "CHOICELAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to a trial CSV file (quick-start mode, defaults for
    /// everything else).
    #[arg(short, long, group = "source")]
    pub trials: Option<PathBuf>,

    /// Override the participant identifier.
    #[arg(long, env = "CHOICELAB_PARTICIPANT")]
    pub participant: Option<String>,

    /// Override the task-type label.
    #[arg(long)]
    pub task: Option<String>,

    /// Override the random seed (for reproducible sessions).
    #[arg(long, env = "CHOICELAB_SEED")]
    pub seed: Option<u64>,

    /// Override the response-log output directory.
    #[arg(short, long, env = "CHOICELAB_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Answer decisions with a simulated participant instead of waiting
    /// for input.
    #[arg(long, value_name = "POLICY")]
    pub simulate: Option<SimulatePolicy>,

    /// Simulated reaction delay in milliseconds.
    #[arg(long, default_value_t = 800, requires = "simulate")]
    pub simulate_delay_ms: u64,

    /// Write structured session events to a file instead of stderr.
    #[arg(long, env = "CHOICELAB_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,
}

// ============================================================================
// Validate / Plan Commands
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("source").multiple(false))]
pub struct PlanArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, group = "source", env = "CHOICELAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to a trial CSV file (quick-start mode).
    #[arg(short, long, group = "source")]
    pub trials: Option<PathBuf>,

    /// Override the random seed so the printed plan matches a later run.
    #[arg(long, env = "CHOICELAB_SEED")]
    pub seed: Option<u64>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log output format choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable log lines.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => Self::Human,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Simulated participant response policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SimulatePolicy {
    /// Always answer A.
    AlwaysA,
    /// Always answer B.
    AlwaysB,
    /// Alternate A and B.
    Alternate,
    /// Choose uniformly at random.
    Random,
}

impl From<SimulatePolicy> for ResponsePolicy {
    fn from(policy: SimulatePolicy) -> Self {
        match policy {
            SimulatePolicy::AlwaysA => Self::AlwaysA,
            SimulatePolicy::AlwaysB => Self::AlwaysB,
            SimulatePolicy::Alternate => Self::Alternate,
            SimulatePolicy::Random => Self::Random,
        }
    }
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

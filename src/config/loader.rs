//! Configuration loader.
//!
//! Loading pipeline:
//! 1. Size check and raw read
//! 2. YAML parsing
//! 3. Deserialization to the typed schema
//! 4. Relative-path resolution against the file's directory
//! 5. Validation (errors abort, warnings are carried in the result)
//! 6. String catalog resolution (file override or compiled-in English)
//! 7. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value;

use crate::config::schema::ExperimentConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;
use crate::text::{StringCatalog, task_table};

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Directory relative paths resolve against; defaults to the
    /// configuration file's own directory.
    pub base_dir: Option<PathBuf>,

    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            max_config_size: env_or("CHOICELAB_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration, with paths resolved.
    pub config: Arc<ExperimentConfig>,

    /// The string catalog the session will localize from.
    pub catalog: StringCatalog,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads an experiment file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, exceeds the size
    /// limit, fails to parse, or fails validation. An unreadable string
    /// catalog override is also an error; a catalog that merely lacks the
    /// task's table only warns.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw_content = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let raw_content = raw_content.strip_prefix('\u{feff}').unwrap_or(&raw_content);

        let root: Value = serde_yaml::from_str(raw_content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;
        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "configuration file is empty".to_string(),
            });
        }

        let mut config: ExperimentConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: format!("failed to deserialize configuration: {e}"),
            })?;

        let base_dir = self
            .options
            .base_dir
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        if let Some(trials) = config.experiment.trials.take() {
            config.experiment.trials = Some(resolve_path(&base_dir, trials));
        }
        if let Some(mut localization) = config.localization.take() {
            localization.strings = resolve_path(&base_dir, localization.strings);
            config.localization = Some(localization);
        }

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }
        for issue in result.warnings {
            warnings.push(LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            });
        }

        let catalog = match &config.localization {
            Some(localization) => StringCatalog::from_yaml_file(&localization.strings)?,
            None => StringCatalog::builtin_english(),
        };
        let table = task_table(&config.experiment.task_type);
        if !catalog.has_table(&table) {
            warnings.push(LoadWarning {
                message: format!(
                    "no localization table '{table}' for task type '{}'; \
                     labels will degrade to fallback markers",
                    config.experiment.task_type
                ),
                location: Some("experiment.task_type".to_string()),
            });
        }

        Ok(LoadResult {
            config: Arc::new(config),
            catalog,
            warnings,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn resolve_path(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

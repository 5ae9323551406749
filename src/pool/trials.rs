//! Trial pool loading and shuffling.
//!
//! Parses the tabular trial source (four comma-separated monetary magnitudes
//! per row) into [`TrialRecord`]s. Malformed rows are dropped with a warning
//! rather than aborting the load; an empty result is the caller's problem.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::PoolError;

/// One binary-choice allocation: self/other payoffs for options A and B.
///
/// Immutable once constructed; the pool owns these and everything else
/// borrows them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialRecord {
    /// Payoff to the participant under option A.
    pub option_a_self: f64,
    /// Payoff to the other party under option A.
    pub option_a_other: f64,
    /// Payoff to the participant under option B.
    pub option_b_self: f64,
    /// Payoff to the other party under option B.
    pub option_b_other: f64,
}

impl TrialRecord {
    /// Creates a record from the four allocation magnitudes.
    #[must_use]
    pub const fn new(
        option_a_self: f64,
        option_a_other: f64,
        option_b_self: f64,
        option_b_other: f64,
    ) -> Self {
        Self {
            option_a_self,
            option_a_other,
            option_b_self,
            option_b_other,
        }
    }

    /// The four magnitudes in source order (A-self, A-other, B-self, B-other).
    #[must_use]
    pub const fn magnitudes(&self) -> [f64; 4] {
        [
            self.option_a_self,
            self.option_a_other,
            self.option_b_self,
            self.option_b_other,
        ]
    }
}

/// A warning about a dropped source row.
#[derive(Debug, Clone)]
pub struct RowWarning {
    /// 1-based line number in the source file.
    pub line: usize,
    /// What was wrong with the row.
    pub message: String,
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Result of loading a trial source: the pool plus per-row diagnostics.
#[derive(Debug)]
pub struct LoadOutcome {
    /// The loaded pool (possibly empty).
    pub pool: TrialPool,
    /// Rows dropped as malformed.
    pub dropped: usize,
    /// One warning per dropped row.
    pub warnings: Vec<RowWarning>,
}

/// The pool of regular-trial allocation records.
///
/// Loaded once at startup and immutable afterwards apart from an optional
/// pre-run [`shuffle`](Self::shuffle).
#[derive(Debug, Clone, Default)]
pub struct TrialPool {
    records: Vec<TrialRecord>,
}

impl TrialPool {
    /// Builds a pool from in-memory records (synthetic pools in tests,
    /// degraded empty pools at runtime).
    #[must_use]
    pub const fn from_records(records: Vec<TrialRecord>) -> Self {
        Self { records }
    }

    /// Loads a pool from a comma-delimited source file.
    ///
    /// Blank lines and `#` comment lines are skipped. A row with fewer than
    /// four fields, a field that fails numeric parsing, or a negative
    /// magnitude is dropped with a warning; it does not abort the load. The
    /// first unparseable line is treated as the header and skipped silently.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Unreadable`] if the file cannot be opened.
    pub fn load(path: &Path) -> Result<LoadOutcome, PoolError> {
        let file = File::open(path).map_err(|source| PoolError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut header_seen = false;

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line_no = idx + 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warnings.push(RowWarning {
                        line: line_no,
                        message: format!("unreadable line: {e}"),
                    });
                    continue;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_row(trimmed) {
                Ok(record) => records.push(record),
                Err(message) => {
                    // A text header is the one unparseable line we expect.
                    if !header_seen && records.is_empty() {
                        header_seen = true;
                        tracing::debug!(line = line_no, "skipping header row");
                        continue;
                    }
                    tracing::warn!(line = line_no, %message, "dropping malformed trial row");
                    warnings.push(RowWarning {
                        line: line_no,
                        message,
                    });
                }
            }
        }

        let dropped = warnings.len();
        Ok(LoadOutcome {
            pool: Self { records },
            dropped,
            warnings,
        })
    }

    /// Unbiased Fisher–Yates permutation using the caller-supplied source.
    ///
    /// A seeded source makes the resulting order reproducible.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
    }

    /// The record at `index`, if within the pool.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TrialRecord> {
        self.records.get(index)
    }

    /// All records in pool order.
    #[must_use]
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Number of records in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the pool holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses one source row into a record.
fn parse_row(row: &str) -> Result<TrialRecord, String> {
    let parts: Vec<&str> = row.split(',').collect();
    if parts.len() < 4 {
        return Err(format!("expected 4 fields, got {}", parts.len()));
    }

    let mut values = [0.0f64; 4];
    for (i, part) in parts.iter().take(4).enumerate() {
        values[i] = part
            .trim()
            .parse()
            .map_err(|_| format!("field {} is not numeric: '{}'", i + 1, part.trim()))?;
        if values[i] < 0.0 {
            return Err(format!("field {} is negative: {}", i + 1, values[i]));
        }
    }

    Ok(TrialRecord::new(values[0], values[1], values[2], values[3]))
}

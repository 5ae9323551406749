//! Response log.
//!
//! Accumulates one record per processed event and serializes the full set
//! to a CSV file on demand. Appends happen in event order during the
//! session; [`ResponseLog::flush`] writes a complete snapshot to a freshly
//! named file, so a second flush (for example after an interruption, or an
//! operator retry after a write failure) produces another self-contained
//! file instead of appending to the first.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ChoiceLabError;
use crate::pool::Choice;

/// Column header for the response CSV, in write order.
pub const RESPONSE_HEADER: &str =
    "ParticipantID,EventNumber,AbsoluteTime,TaskTypeOrEvent,MessageChosenOrResponse,ReactionTime,BarData";

/// Separator between the four stimulus magnitudes in the `BarData` column.
const BAR_DATA_SEPARATOR: &str = "|";

/// Sentinel written when a record has no stimulus data.
const NO_BAR_DATA: &str = "N/A";

/// What the participant answered for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseChoice {
    /// A captured A/B decision.
    Chosen(Choice),
    /// The session ended before a decision was made.
    None,
    /// The event could not be resolved to stimulus data and was skipped.
    Skipped,
}

impl std::fmt::Display for ResponseChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chosen(choice) => write!(f, "{choice}"),
            Self::None => write!(f, "None"),
            Self::Skipped => write!(f, "Error/Skipped"),
        }
    }
}

/// One row of the response log. Created when a decision is captured (or a
/// skip fallback fires) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    /// Operator-assigned participant identifier.
    pub participant_id: String,
    /// 1-based position in the event sequence.
    pub event_number: usize,
    /// Seconds since the session started.
    pub absolute_secs: f64,
    /// Task-type name for regular trials, or a fixed event label such as
    /// `AttentionTest`.
    pub event_label: String,
    /// The participant's answer.
    pub choice: ResponseChoice,
    /// Seconds between decision-phase entry and the captured input.
    pub reaction_secs: f64,
    /// The four stimulus magnitudes shown for this event, when resolved.
    pub bar_data: Option<[f64; 4]>,
}

impl ResponseRecord {
    fn csv_line(&self) -> String {
        let bar = self.bar_data.map_or_else(
            || NO_BAR_DATA.to_string(),
            |values| {
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(BAR_DATA_SEPARATOR)
            },
        );
        format!(
            "{},{},{:.4},{},{},{:.4},{}",
            self.participant_id,
            self.event_number,
            self.absolute_secs,
            self.event_label,
            self.choice,
            self.reaction_secs,
            bar
        )
    }
}

/// In-memory record list with snapshot-style CSV serialization.
///
/// `append` is the only mutator and must be called in strictly increasing
/// `event_number` order starting at 1; the orchestrator owns that ordering
/// and a violation is a bug there, not a runtime condition this type
/// recovers from.
#[derive(Debug, Clone, Default)]
pub struct ResponseLog {
    records: Vec<ResponseRecord>,
}

impl ResponseLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends one record to the log.
    pub fn append(&mut self, record: ResponseRecord) {
        debug_assert_eq!(
            record.event_number,
            self.records.len() + 1,
            "response records must arrive in event order"
        );
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the full current record set to a new CSV file in `dir`.
    ///
    /// The filename embeds the task label, a UTC timestamp, the process id,
    /// and a random suffix, so every flush targets a distinct destination
    /// and repeated flushes never clobber or duplicate into an earlier
    /// file. The file always carries the header row, even when the log is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written. The in-memory records are untouched on failure,
    /// so the caller may retry.
    pub fn flush(&self, dir: &Path, task_label: &str) -> Result<PathBuf, ChoiceLabError> {
        fs::create_dir_all(dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let pid = std::process::id();
        let rand_suffix: u16 = rand::random();
        let filename = format!(
            "responses-{}-{timestamp}-{pid}-{rand_suffix:04x}.csv",
            file_slug(task_label)
        );
        let path = dir.join(filename);

        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{RESPONSE_HEADER}")?;
        for record in &self.records {
            writeln!(writer, "{}", record.csv_line())?;
        }
        writer.flush()?;

        debug!(path = %path.display(), records = self.records.len(), "response log written");

        Ok(path)
    }
}

/// Lowercases a task label and maps anything outside `[a-z0-9]` to `-` so
/// it is safe inside a filename.
fn file_slug(label: &str) -> String {
    let slug: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() { "task".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn record(event_number: usize, choice: ResponseChoice) -> ResponseRecord {
        ResponseRecord {
            participant_id: "p01".to_string(),
            event_number,
            absolute_secs: 1.5 * event_number as f64,
            event_label: "Social".to_string(),
            choice,
            reaction_secs: 0.75,
            bar_data: Some([10.0, 5.0, 5.0, 5.0]),
        }
    }

    #[test]
    fn empty_log_flushes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResponseLog::new();

        let path = log.flush(dir.path(), "Social").unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert_eq!(content, format!("{RESPONSE_HEADER}\n"));
    }

    #[test]
    fn rows_follow_header_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ResponseLog::new();
        log.append(record(1, ResponseChoice::Chosen(Choice::A)));
        log.append(record(2, ResponseChoice::Chosen(Choice::B)));
        log.append(record(3, ResponseChoice::None));

        let path = log.flush(dir.path(), "Social").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], RESPONSE_HEADER);
        assert!(lines[1].starts_with("p01,1,"));
        assert!(lines[1].contains(",A,"));
        assert!(lines[2].contains(",B,"));
        assert!(lines[3].contains(",None,"));
        assert!(lines[1].ends_with("10|5|5|5"));
    }

    #[test]
    fn skipped_record_renders_sentinel_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ResponseLog::new();
        log.append(ResponseRecord {
            participant_id: "p01".to_string(),
            event_number: 1,
            absolute_secs: 2.0,
            event_label: "Social".to_string(),
            choice: ResponseChoice::Skipped,
            reaction_secs: 0.0,
            bar_data: None,
        });

        let path = log.flush(dir.path(), "Social").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let row = content.trim().lines().nth(1).unwrap();

        assert!(row.contains(",Error/Skipped,"));
        assert!(row.contains(",0.0000,"));
        assert!(row.ends_with(",N/A"));
    }

    #[test]
    fn event_numbers_stay_strictly_monotonic() {
        let mut log = ResponseLog::new();
        for n in 1..=20 {
            log.append(record(n, ResponseChoice::Chosen(Choice::A)));
        }

        let numbers: Vec<usize> = log.records().iter().map(|r| r.event_number).collect();
        assert_eq!(numbers, (1..=20).collect::<Vec<_>>());
        assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn repeated_flush_targets_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ResponseLog::new();
        log.append(record(1, ResponseChoice::Chosen(Choice::A)));

        let first = log.flush(dir.path(), "Social").unwrap();
        log.append(record(2, ResponseChoice::Chosen(Choice::B)));
        let second = log.flush(dir.path(), "Social").unwrap();

        assert_ne!(first, second);
        let first_rows = fs::read_to_string(&first).unwrap().trim().lines().count();
        let second_rows = fs::read_to_string(&second).unwrap().trim().lines().count();
        assert_eq!(first_rows, 2);
        assert_eq!(second_rows, 3);
    }

    #[test]
    fn filename_embeds_task_slug() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResponseLog::new();

        let path = log.flush(dir.path(), "Social Comparison").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();

        assert!(name.starts_with("responses-social-comparison-"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn slug_never_empty() {
        assert_eq!(file_slug(""), "task");
        assert_eq!(file_slug("Gain/Loss"), "gain-loss");
    }
}

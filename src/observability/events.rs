//! Structured session event stream for `choicelab`.
//!
//! Discrete, typed events emitted while a session runs. Events are
//! serialized as newline-delimited JSON (JSONL) and include a monotonically
//! increasing sequence number for ordering guarantees. Every degraded-mode
//! condition (dropped trial rows, truncated attention placement, slot
//! resolution failures, localization fallbacks, flush failures) appears here
//! with its own tag so consumers and tests can dispatch by category.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a `choicelab` session.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session has been assembled and is about to run.
    SessionStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
        /// Participant identifier.
        participant_id: String,
        /// Experimental condition label.
        task_type: String,
        /// Number of events in the sequenced plan.
        total_events: usize,
        /// Number of runs in the partition.
        total_runs: usize,
    },

    /// The trial source could not be read and the pool was degraded to empty.
    TrialSourceDegraded {
        /// When the degradation happened.
        timestamp: DateTime<Utc>,
        /// Path to the unreadable source.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// Malformed rows were dropped while loading the trial source.
    TrialRowsDropped {
        /// When the load finished.
        timestamp: DateTime<Utc>,
        /// Path to the trial source.
        path: String,
        /// Rows parsed successfully.
        kept: usize,
        /// Rows dropped as malformed.
        dropped: usize,
    },

    /// Fewer attention tests were placed than configured.
    SequenceTruncated {
        /// When sequencing finished.
        timestamp: DateTime<Utc>,
        /// Attention tests actually placed.
        placed: usize,
        /// Attention tests configured.
        configured: usize,
    },

    /// An event slot could not be mapped to its underlying trial.
    SlotResolutionFailed {
        /// When the failure was detected.
        timestamp: DateTime<Utc>,
        /// Sequence-wide event index of the slot.
        event_index: usize,
        /// Adjusted index that fell outside the pool.
        trial_index: usize,
        /// Size of the trial pool.
        pool_len: usize,
    },

    /// A localized-string lookup missed and the fallback marker was used.
    LocalizationFallback {
        /// When the lookup missed.
        timestamp: DateTime<Utc>,
        /// Table the key was looked up in.
        table: String,
        /// The missing key.
        key: String,
    },

    /// The orchestrator entered a new phase for an event.
    PhaseEntered {
        /// When the phase was entered.
        timestamp: DateTime<Utc>,
        /// 1-based event number the phase belongs to.
        event_number: usize,
        /// Phase name (`onset`, `decision`, `confirmation`, `fixation`).
        phase: String,
    },

    /// A decision was captured and a response record created.
    DecisionCaptured {
        /// When the record was created.
        timestamp: DateTime<Utc>,
        /// 1-based event number.
        event_number: usize,
        /// Task-type label or `"AttentionTest"`.
        event_label: String,
        /// The captured choice letter.
        choice: String,
        /// Reaction time in seconds.
        reaction_secs: f64,
    },

    /// A run of events finished.
    RunCompleted {
        /// When the run finished.
        timestamp: DateTime<Utc>,
        /// 1-based index of the completed run.
        run: usize,
        /// Total runs in the plan.
        total_runs: usize,
    },

    /// An inter-run rest break began.
    BreakStarted {
        /// When the break began.
        timestamp: DateTime<Utc>,
        /// 1-based index of the run just completed.
        after_run: usize,
        /// Configured break length in seconds.
        duration_secs: f64,
    },

    /// An inter-run rest break ended.
    BreakEnded {
        /// When the break ended.
        timestamp: DateTime<Utc>,
        /// 1-based index of the run about to start.
        before_run: usize,
    },

    /// The response log was flushed to durable storage.
    ResponsesFlushed {
        /// When the flush completed.
        timestamp: DateTime<Utc>,
        /// Destination file.
        path: String,
        /// Number of records written.
        records: usize,
    },

    /// A flush attempt failed; in-memory records are retained.
    FlushFailed {
        /// When the flush failed.
        timestamp: DateTime<Utc>,
        /// Destination directory that was attempted.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The session finished (normally or by interruption).
    SessionCompleted {
        /// When the session finished.
        timestamp: DateTime<Utc>,
        /// Events fully processed, placeholders included.
        completed_events: usize,
        /// Placeholder records emitted for unresolvable slots.
        placeholder_events: usize,
        /// Whether the session was cut short by the operator.
        interrupted: bool,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps a [`SessionEvent`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: SessionEvent,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are silently dropped
/// because observability must never abort a session in progress.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug — provide a manual impl.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    ///
    /// This is the default for interactive operation — the session summary
    /// owns stdout.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    ///
    /// Failures are silently dropped — observability must not abort a session.
    pub fn emit(&self, event: SessionEvent) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_event() -> SessionEvent {
        SessionEvent::SessionStarted {
            timestamp: DateTime::parse_from_rfc3339("2026-03-02T09:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            participant_id: "P001".to_owned(),
            task_type: "give".to_owned(),
            total_events: 12,
            total_runs: 3,
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "session_started");
        assert_eq!(parsed["participant_id"], "P001");
    }

    #[test]
    fn emitter_writes_valid_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_event());

        let output = tw.contents();
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["type"], "session_started");
        assert_eq!(parsed["total_events"], 12);
        assert_eq!(parsed["sequence"], 0);
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_event());
        emitter.emit(SessionEvent::SessionCompleted {
            timestamp: Utc::now(),
            completed_events: 12,
            placeholder_events: 0,
            interrupted: false,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
    }

    #[test]
    fn warning_categories_have_distinct_tags() {
        let now = Utc::now();
        let variants: Vec<(SessionEvent, &str)> = vec![
            (
                SessionEvent::TrialSourceDegraded {
                    timestamp: now,
                    path: "trials.csv".to_owned(),
                    reason: "not found".to_owned(),
                },
                "trial_source_degraded",
            ),
            (
                SessionEvent::SequenceTruncated {
                    timestamp: now,
                    placed: 3,
                    configured: 5,
                },
                "sequence_truncated",
            ),
            (
                SessionEvent::SlotResolutionFailed {
                    timestamp: now,
                    event_index: 4,
                    trial_index: 9,
                    pool_len: 3,
                },
                "slot_resolution_failed",
            ),
            (
                SessionEvent::LocalizationFallback {
                    timestamp: now,
                    table: "give".to_owned(),
                    key: "option_a".to_owned(),
                },
                "localization_fallback",
            ),
            (
                SessionEvent::FlushFailed {
                    timestamp: now,
                    path: "/readonly".to_owned(),
                    reason: "permission denied".to_owned(),
                },
                "flush_failed",
            ),
        ];

        for (variant, expected_tag) in &variants {
            let json = serde_json::to_string(variant).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed["type"], *expected_tag, "wrong tag in {json}");
        }
    }

    #[test]
    fn envelope_flattens_event_fields() {
        let envelope = EventEnvelope {
            sequence: 7,
            event: sample_event(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        // Flat structure — sequence, type, and event fields at the same level
        assert_eq!(parsed["sequence"], 7);
        assert_eq!(parsed["type"], "session_started");
        assert_eq!(parsed["participant_id"], "P001");
        assert!(
            parsed.get("event").is_none(),
            "event field should be flattened"
        );
    }
}

//! Shared integration-test harness: in-process sessions with recording
//! collaborators and a captured structured-event stream.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use choicelab::config::ExperimentConfig;
use choicelab::observability::EventEmitter;
use choicelab::present::{Frame, Presenter, ResponsePolicy, SimulatedParticipant};
use choicelab::session::{DecisionLatch, ParticipantHandle, Session, SessionOptions};
use choicelab::text::StringCatalog;

/// Writes a trial CSV fixture with a header row and the given magnitudes.
pub fn write_trials(dir: &Path, rows: &[[f64; 4]]) -> PathBuf {
    let path = dir.join("trials.csv");
    let mut contents = String::from("SelfA,OtherA,SelfB,OtherB\n");
    for row in rows {
        contents.push_str(&format!("{},{},{},{}\n", row[0], row[1], row[2], row[3]));
    }
    std::fs::write(&path, contents).expect("failed to write trial fixture");
    path
}

/// Parses a YAML experiment configuration fixture.
pub fn config_from_yaml(yaml: &str) -> Arc<ExperimentConfig> {
    Arc::new(serde_yaml::from_str(yaml).expect("invalid config fixture"))
}

/// The single file inside `dir`; panics if there is not exactly one.
pub fn only_file_in(dir: &Path) -> PathBuf {
    let mut entries = std::fs::read_dir(dir).expect("failed to read output dir");
    let entry = entries
        .next()
        .expect("expected one output file, found none")
        .expect("failed to read dir entry");
    assert!(
        entries.next().is_none(),
        "expected exactly one output file"
    );
    entry.path()
}

// ============================================================================
// Recording presenter
// ============================================================================

/// Presenter that records every frame it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    frames: Mutex<Vec<Frame>>,
}

impl RecordingPresenter {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().expect("frame lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Presenter for RecordingPresenter {
    async fn present(&self, frame: Frame) {
        self.frames.lock().expect("frame lock poisoned").push(frame);
    }
}

// ============================================================================
// Event capture
// ============================================================================

struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("event buffer poisoned")
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Captured NDJSON event stream, parseable after the session finishes.
#[derive(Clone, Default)]
pub struct EventCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl EventCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// An emitter writing into this capture.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter::new(Box::new(SharedWriter(Arc::clone(&self.buf))))
    }

    /// All captured events, parsed in emission order.
    pub fn events(&self) -> Vec<serde_json::Value> {
        let buf = self.buf.lock().expect("event buffer poisoned");
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("invalid event JSON"))
            .collect()
    }

    /// The `type` field of every captured event, in order.
    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|event| {
                event["type"]
                    .as_str()
                    .expect("event missing type field")
                    .to_string()
            })
            .collect()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.event_types()
            .iter()
            .filter(|t| t.as_str() == event_type)
            .count()
    }
}

// ============================================================================
// Session assembly
// ============================================================================

/// Prepares an in-process session answered by a simulated participant,
/// with a recording presenter underneath it and a captured event stream.
pub fn simulated_session(
    config: Arc<ExperimentConfig>,
    policy: ResponsePolicy,
    delay: Duration,
    output_dir: PathBuf,
) -> (Session, EventCapture, Arc<RecordingPresenter>, CancellationToken) {
    let capture = EventCapture::new();
    let emitter = Arc::new(capture.emitter());
    let latch = Arc::new(DecisionLatch::new());
    let recording = Arc::new(RecordingPresenter::default());
    let base: Arc<dyn Presenter> = recording.clone();
    let participant = Arc::new(SimulatedParticipant::new(
        base,
        ParticipantHandle::new(Arc::clone(&latch)),
        policy,
        delay,
        0,
    ));
    let cancel = CancellationToken::new();

    let session = Session::prepare(SessionOptions {
        config,
        catalog: StringCatalog::builtin_english(),
        latch,
        presenter: participant,
        emitter,
        cancel: cancel.clone(),
        output_dir: Some(output_dir),
    });

    (session, capture, recording, cancel)
}

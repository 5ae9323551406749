mod common;

use std::time::Duration;

use common::{config_from_yaml, only_file_in, simulated_session, write_trials};

use choicelab::error::{ChoiceLabError, SessionError};
use choicelab::pool::{AttentionTestSet, Choice};
use choicelab::present::{Frame, ResponsePolicy};
use choicelab::sequence::EventKind;
use choicelab::session::ATTENTION_EVENT_LABEL;

const HEADER: &str =
    "ParticipantID,EventNumber,AbsoluteTime,TaskTypeOrEvent,MessageChosenOrResponse,ReactionTime,BarData";

#[tokio::test(start_paused = true)]
async fn full_session_records_every_event_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rows: Vec<[f64; 4]> = (0..10)
        .map(|i| [10.0 + f64::from(i), 5.0, 5.0, 5.0])
        .collect();
    let trials = write_trials(dir.path(), &rows);
    let out = dir.path().join("results");
    let config = config_from_yaml(&format!(
        "\
experiment:
  task_type: Social
  participant_id: p07
  trials: {}
  seed: 11
runs:
  events_per_run: 5
",
        trials.display()
    ));

    let (session, capture, _presenter, _cancel) = simulated_session(
        config,
        ResponsePolicy::AlwaysA,
        Duration::from_millis(300),
        out.clone(),
    );
    let plan = session.describe();
    let slots = session.sequence_outcome().slots.clone();
    assert_eq!(plan.trial_count, 10);
    assert_eq!(plan.total_events, 10 + plan.placed_tests);

    let summary = session
        .run()
        .await
        .expect("session should run to completion");

    assert_eq!(summary.completed_events, plan.total_events);
    assert_eq!(summary.placeholder_events, 0);
    assert_eq!(summary.total_runs, plan.total_events.div_ceil(5));
    assert_eq!(summary.attention_total, plan.placed_tests);
    assert_eq!(capture.count_of("decision_captured"), plan.total_events);
    assert_eq!(capture.count_of("phase_entered"), plan.total_events * 4);

    // Every always-A answer that matches a probe's known answer scores.
    let tests = AttentionTestSet::builtin();
    let expected_correct = slots
        .iter()
        .filter(|slot| match slot.kind {
            EventKind::Attention { test_index } => tests
                .get(test_index)
                .is_some_and(|test| test.is_correct(Choice::A)),
            EventKind::Regular => false,
        })
        .count();
    assert_eq!(summary.attention_correct, expected_correct);

    let path = only_file_in(&out);
    assert_eq!(summary.responses_path, path);
    let csv = std::fs::read_to_string(&path).expect("read responses");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines.len(), 1 + plan.total_events, "one row per event");

    let mut last_time = -1.0_f64;
    for (i, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 7, "row {i} should have 7 columns");
        assert_eq!(fields[0], "p07");
        assert_eq!(
            fields[1],
            (i + 1).to_string(),
            "event numbers count up from 1"
        );
        let absolute: f64 = fields[2].parse().expect("absolute time");
        assert!(absolute > last_time, "absolute times should increase");
        last_time = absolute;
        assert_eq!(fields[4], "A", "an always-A participant answers A");
        assert_eq!(fields[5], "0.3000", "reaction equals the simulated delay");
        assert_ne!(fields[6], "N/A", "every slot resolves to bar data");
    }

    // Attention rows carry the fixed label, trial rows the task type.
    for slot in &slots {
        let label = lines[1 + slot.event_index]
            .split(',')
            .nth(3)
            .expect("label column");
        match slot.kind {
            EventKind::Attention { .. } => assert_eq!(label, ATTENTION_EVENT_LABEL),
            EventKind::Regular => assert_eq!(label, "Social"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn event_stream_traces_phases_runs_and_breaks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rows = vec![[8.0, 2.0, 5.0, 5.0]; 6];
    let trials = write_trials(dir.path(), &rows);
    let out = dir.path().join("results");
    // Attention disabled so the stream shape is exact: six trials over two
    // runs of four, one break in between.
    let config = config_from_yaml(&format!(
        "\
experiment:
  task_type: Carbon
  participant_id: p01
  trials: {}
  seed: 7
runs:
  events_per_run: 4
attention:
  enabled: false
",
        trials.display()
    ));

    let (session, capture, presenter, _cancel) = simulated_session(
        config,
        ResponsePolicy::Alternate,
        Duration::from_millis(450),
        out,
    );
    let summary = session
        .run()
        .await
        .expect("session should run to completion");
    assert_eq!(summary.total_events, 6);
    assert_eq!(summary.total_runs, 2);
    assert_eq!(summary.attention_total, 0);

    let per_event = [
        "phase_entered",
        "phase_entered",
        "decision_captured",
        "phase_entered",
        "phase_entered",
    ];
    let mut expected: Vec<String> = vec!["session_started".into()];
    for _ in 0..4 {
        expected.extend(per_event.iter().map(|s| (*s).to_string()));
    }
    expected.push("run_completed".into());
    expected.push("break_started".into());
    expected.push("break_ended".into());
    for _ in 0..2 {
        expected.extend(per_event.iter().map(|s| (*s).to_string()));
    }
    expected.push("run_completed".into());
    expected.push("responses_flushed".into());
    expected.push("session_completed".into());
    assert_eq!(capture.event_types(), expected);

    let events = capture.events();
    let break_started = events
        .iter()
        .find(|e| e["type"] == "break_started")
        .expect("break event");
    assert_eq!(break_started["after_run"], 1);
    assert_eq!(break_started["duration_secs"], 30.0);
    let break_ended = events
        .iter()
        .find(|e| e["type"] == "break_ended")
        .expect("break end event");
    assert_eq!(break_ended["before_run"], 2);

    let choices: Vec<String> = events
        .iter()
        .filter(|e| e["type"] == "decision_captured")
        .map(|e| e["choice"].as_str().expect("choice field").to_string())
        .collect();
    assert_eq!(choices, ["A", "B", "A", "B", "A", "B"]);

    let last = events.last().expect("final event");
    assert_eq!(last["interrupted"], false);
    assert_eq!(last["completed_events"], 6);

    let frames = presenter.frames();
    assert!(
        matches!(frames.last(), Some(Frame::Complete { .. })),
        "the completion screen is the final frame"
    );
    let breaks = frames
        .iter()
        .filter(|f| matches!(f, Frame::Break { .. }))
        .count();
    assert_eq!(breaks, 1, "one break between the two runs");
}

#[tokio::test(start_paused = true)]
async fn interruption_mid_decision_flushes_a_partial_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rows = vec![[9.0, 1.0, 5.0, 5.0]; 5];
    let trials = write_trials(dir.path(), &rows);
    let out = dir.path().join("results");
    let config = config_from_yaml(&format!(
        "\
experiment:
  task_type: Social
  participant_id: p02
  trials: {}
  seed: 3
",
        trials.display()
    ));

    let (session, capture, _presenter, cancel) = simulated_session(
        config,
        ResponsePolicy::AlwaysB,
        Duration::from_millis(300),
        out.clone(),
    );

    // Cancellation lands during the first decision window: the onset runs
    // 0..2.0s and the simulated answer is due at 2.3s.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2100)).await;
        cancel.cancel();
    });

    let err = session
        .run()
        .await
        .expect_err("cancelled session should not complete");
    assert!(matches!(
        err,
        ChoiceLabError::Session(SessionError::Interrupted)
    ));

    let csv = std::fs::read_to_string(only_file_in(&out)).expect("read responses");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2, "header plus the one in-flight event");
    assert_eq!(lines[0], HEADER);
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields[1], "1");
    assert_eq!(fields[4], "None", "no decision was captured");
    assert_eq!(fields[5], "0.0000");
    assert_ne!(fields[6], "N/A", "the stimulus had resolved before the cut");

    assert_eq!(capture.count_of("responses_flushed"), 1);
    let events = capture.events();
    let last = events.last().expect("final event");
    assert_eq!(last["type"], "session_completed");
    assert_eq!(last["interrupted"], true);
}

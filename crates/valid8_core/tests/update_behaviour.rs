use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use valid8_core::{
    update, Effect, JobOutcome, Msg, PollTiming, PollerState, RunPhase, Stage, StatusUpdate,
    UploadInfo, ValidationResults,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(valid8_logging::initialize_for_tests);
}

fn upload() -> UploadInfo {
    UploadInfo {
        name: "providers.csv".to_string(),
        size: 2048,
    }
}

fn started(state: PollerState) -> (PollerState, u64) {
    let (state, effects) = update(
        state,
        Msg::StartRequested {
            upload: upload(),
            at_ms: 0,
        },
    );
    let run = match effects.as_slice() {
        [Effect::SubmitUpload { run }] => *run,
        other => panic!("unexpected effects: {other:?}"),
    };
    (state, run)
}

fn polling(state: PollerState) -> (PollerState, u64) {
    let (state, run) = started(state);
    let (state, _) = update(
        state,
        Msg::SubmitSucceeded {
            run,
            job_id: "job-42".to_string(),
            at_ms: 10,
        },
    );
    (state, run)
}

fn texts(state: &PollerState) -> Vec<String> {
    state.log().iter().map(|e| e.text.clone()).collect()
}

#[test]
fn start_submits_once_and_ignores_second_start() {
    init_logging();
    let (state, run) = started(PollerState::default());
    assert_eq!(state.phase(), RunPhase::Submitting);
    assert_eq!(run, 1);

    let (state, effects) = update(
        state,
        Msg::StartRequested {
            upload: upload(),
            at_ms: 5,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.run_id(), 1);
    assert_eq!(texts(&state), vec!["Uploading providers.csv (2048 bytes)"]);
}

#[test]
fn submit_success_logs_job_id_and_schedules_poll() {
    init_logging();
    let (state, run) = started(PollerState::default());
    let (state, effects) = update(
        state,
        Msg::SubmitSucceeded {
            run,
            job_id: "job-42".to_string(),
            at_ms: 10,
        },
    );

    assert_eq!(state.phase(), RunPhase::Polling);
    assert_eq!(
        effects,
        vec![Effect::SchedulePoll {
            run,
            after: Duration::from_secs(1)
        }]
    );
    assert_eq!(texts(&state).last().unwrap(), "Job created: job-42");
}

#[test]
fn submit_failure_is_terminal_without_polling() {
    init_logging();
    let (state, run) = started(PollerState::default());
    let (state, effects) = update(
        state,
        Msg::SubmitFailed {
            run,
            message: "File too large".to_string(),
            at_ms: 30,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.phase(), RunPhase::Failed);
    assert_eq!(
        state.outcome(),
        Some(JobOutcome::Failed {
            job_id: None,
            error: "File too large".to_string(),
            duration_ms: 30,
        })
    );

    // A tick that slipped through must not start polling.
    let (_state, effects) = update(state, Msg::PollTick { run, at_ms: 1000 });
    assert!(effects.is_empty());
}

#[test]
fn tick_requests_status_and_blocks_second_in_flight_poll() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let (state, effects) = update(state, Msg::PollTick { run, at_ms: 1000 });
    assert_eq!(
        effects,
        vec![Effect::FetchStatus {
            run,
            job_id: "job-42".to_string()
        }]
    );

    let (_state, effects) = update(state, Msg::PollTick { run, at_ms: 2000 });
    assert!(effects.is_empty());
}

#[test]
fn poll_sequence_dedupes_log_and_keeps_progress_monotonic() {
    init_logging();
    let (mut state, run) = polling(PollerState::default());
    let sequence = [
        StatusUpdate::running(Stage::Ingestion, 10.0),
        StatusUpdate::running(Stage::Ingestion, 10.0),
        StatusUpdate::running(Stage::Validation, 60.0),
        StatusUpdate::completed(ValidationResults::default()),
    ];

    let mut shown = Vec::new();
    for (i, status) in sequence.into_iter().enumerate() {
        let at_ms = 1000 * (i as u64 + 1);
        let (next, _) = update(state, Msg::PollTick { run, at_ms });
        let (next, _) = update(
            next,
            Msg::StatusReceived {
                run,
                update: status,
                at_ms,
            },
        );
        shown.push(next.progress());
        state = next;
    }

    assert_eq!(shown, vec![10, 10, 60, 100]);
    let log = texts(&state);
    assert!(log.windows(2).all(|pair| pair[0] != pair[1]), "{log:?}");
    assert_eq!(
        log,
        vec![
            "Uploading providers.csv (2048 bytes)",
            "Job created: job-42",
            "Ingesting provider records",
            "Validating providers against registries",
            "Validation complete",
        ]
    );
    assert_eq!(state.phase(), RunPhase::Finishing);
}

#[test]
fn progress_never_regresses_and_is_clamped() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let mut state = state;
    for (progress, expected) in [(40.0, 40), (25.0, 40), (140.0, 100), (-3.0, 100)] {
        let (next, _) = update(state, Msg::PollTick { run, at_ms: 1000 });
        let (next, _) = update(
            next,
            Msg::StatusReceived {
                run,
                update: StatusUpdate::running(Stage::Validation, progress),
                at_ms: 1000,
            },
        );
        assert_eq!(next.progress(), expected);
        state = next;
    }
}

#[test]
fn unknown_stage_keeps_current_stage() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let (state, _) = update(state, Msg::PollTick { run, at_ms: 1000 });
    let (state, _) = update(
        state,
        Msg::StatusReceived {
            run,
            update: StatusUpdate {
                stage: None,
                ..StatusUpdate::running(Stage::Ingestion, 40.0)
            },
            at_ms: 1000,
        },
    );
    assert_eq!(state.view().stage, Stage::Uploading);
    assert_eq!(state.progress(), 40);
}

#[test]
fn completion_waits_for_finish_delay() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let (state, _) = update(state, Msg::PollTick { run, at_ms: 1000 });
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            run,
            update: StatusUpdate::completed(ValidationResults::default()),
            at_ms: 1000,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FinishAfter {
            run,
            after: Duration::from_millis(800)
        }]
    );
    assert!(state.outcome().is_none());

    let (state, _) = update(state, Msg::FinishElapsed { run, at_ms: 1800 });
    assert_eq!(
        state.outcome(),
        Some(JobOutcome::Completed {
            job_id: "job-42".to_string(),
            results: ValidationResults::default(),
            duration_ms: 1800,
        })
    );
}

#[test]
fn backend_failure_surfaces_error_and_ignores_late_responses() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let (state, _) = update(state, Msg::PollTick { run, at_ms: 1000 });
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            run,
            update: StatusUpdate::failed("NPI registry unavailable"),
            at_ms: 1000,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), RunPhase::Failed);
    assert_eq!(state.view().error.as_deref(), Some("NPI registry unavailable"));

    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            run,
            update: StatusUpdate::completed(ValidationResults::default()),
            at_ms: 1500,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn failure_without_message_uses_generic_text() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let (state, _) = update(state, Msg::PollTick { run, at_ms: 1000 });
    let (state, _) = update(
        state,
        Msg::StatusReceived {
            run,
            update: StatusUpdate {
                error: None,
                ..StatusUpdate::failed("")
            },
            at_ms: 1000,
        },
    );
    assert_eq!(state.view().error.as_deref(), Some("Validation failed"));
}

#[test]
fn stale_run_messages_are_ignored() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            run: run + 7,
            update: StatusUpdate::failed("stale"),
            at_ms: 1000,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn transport_errors_keep_polling_and_are_not_repeated_in_log() {
    init_logging();
    let (mut state, run) = polling(PollerState::default());
    for at_ms in [1000, 2000] {
        let (next, _) = update(state, Msg::PollTick { run, at_ms });
        let (next, effects) = update(
            next,
            Msg::PollFailed {
                run,
                message: "connection refused".to_string(),
                at_ms,
            },
        );
        assert_eq!(
            effects,
            vec![Effect::SchedulePoll {
                run,
                after: Duration::from_secs(1)
            }]
        );
        assert_eq!(next.phase(), RunPhase::Polling);
        state = next;
    }
    let failures = texts(&state)
        .into_iter()
        .filter(|t| t.starts_with("Status check failed"))
        .count();
    assert_eq!(failures, 1);
}

#[test]
fn polling_past_deadline_fails_the_run() {
    init_logging();
    let timing = PollTiming {
        max_poll_duration: Some(Duration::from_secs(5)),
        ..PollTiming::default()
    };
    let (state, run) = polling(PollerState::new(timing));
    let (state, effects) = update(state, Msg::PollTick { run, at_ms: 5_010 });

    assert!(effects.is_empty());
    assert_eq!(state.phase(), RunPhase::Failed);
    assert_eq!(
        state.view().error.as_deref(),
        Some("Timed out waiting for validation results after 5s")
    );
}

#[test]
fn cancel_stops_polling_and_suppresses_later_responses() {
    init_logging();
    let (state, run) = polling(PollerState::default());
    let (state, _) = update(state, Msg::PollTick { run, at_ms: 1000 });
    let (state, _) = update(state, Msg::CancelRequested { run, at_ms: 1200 });
    assert_eq!(state.phase(), RunPhase::Cancelled);
    assert_eq!(
        state.outcome(),
        Some(JobOutcome::Cancelled {
            job_id: Some("job-42".to_string())
        })
    );

    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            run,
            update: StatusUpdate::running(Stage::Validation, 80.0),
            at_ms: 1300,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.progress(), 0);
}

#[test]
fn dirty_flag_tracks_changes() {
    init_logging();
    let (mut state, _run) = started(PollerState::default());
    assert!(state.view().dirty);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn idle_state_ignores_run_messages() {
    let state = PollerState::default();
    let (next, effects) = update(state.clone(), Msg::PollTick { run: 0, at_ms: 1000 });
    assert_eq!(next, state);
    assert!(effects.is_empty());

    let (next, effects) = update(next, Msg::CancelRequested { run: 0, at_ms: 1000 });
    assert_eq!(next, state);
    assert!(effects.is_empty());
}

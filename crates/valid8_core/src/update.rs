use crate::{Effect, Msg, PollerState, RunPhase};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages tagged with a run other than the current one, or arriving in a
/// phase that does not expect them, leave the state untouched. That keeps a
/// late status response from overwriting a terminal state.
pub fn update(mut state: PollerState, msg: Msg) -> (PollerState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested { upload, at_ms } => {
            // One submission per poller instance.
            if state.phase() != RunPhase::Idle {
                return (state, Vec::new());
            }
            let run = state.begin_run(upload, at_ms);
            vec![Effect::SubmitUpload { run }]
        }
        Msg::SubmitSucceeded { run, job_id, at_ms } => {
            if !state.accepts(run, RunPhase::Submitting) {
                return (state, Vec::new());
            }
            state.start_polling(job_id, at_ms);
            vec![Effect::SchedulePoll {
                run,
                after: state.timing().poll_interval,
            }]
        }
        Msg::SubmitFailed {
            run,
            message,
            at_ms,
        } => {
            if state.accepts(run, RunPhase::Submitting) {
                state.fail(message, at_ms);
            }
            Vec::new()
        }
        Msg::PollTick { run, at_ms } => {
            if !state.accepts(run, RunPhase::Polling) || state.poll_in_flight() {
                return (state, Vec::new());
            }
            if state.poll_deadline_passed(at_ms) {
                let limit = state
                    .timing()
                    .max_poll_duration
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                state.fail(
                    format!("Timed out waiting for validation results after {limit}s"),
                    at_ms,
                );
                return (state, Vec::new());
            }
            match state.current_job_id().map(ToOwned::to_owned) {
                Some(job_id) => {
                    state.mark_poll_in_flight();
                    vec![Effect::FetchStatus { run, job_id }]
                }
                None => Vec::new(),
            }
        }
        Msg::StatusReceived { run, update, at_ms } => {
            if !state.accepts(run, RunPhase::Polling) {
                return (state, Vec::new());
            }
            state.apply_status(update, at_ms)
        }
        Msg::PollFailed {
            run,
            message,
            at_ms,
        } => {
            if !state.accepts(run, RunPhase::Polling) {
                return (state, Vec::new());
            }
            state.record_poll_failure(&message, at_ms);
            vec![Effect::SchedulePoll {
                run,
                after: state.timing().poll_interval,
            }]
        }
        Msg::FinishElapsed { run, at_ms } => {
            if state.accepts(run, RunPhase::Finishing) {
                state.complete(at_ms);
            }
            Vec::new()
        }
        Msg::CancelRequested { run, at_ms } => {
            // A run holding its result is past the point of cancelling.
            if state.accepts(run, RunPhase::Submitting) || state.accepts(run, RunPhase::Polling) {
                state.cancel(at_ms);
            }
            Vec::new()
        }
    };

    (state, effects)
}

use std::collections::VecDeque;
use std::sync::mpsc;

use tokio_util::sync::CancellationToken;
use valid8_core::{
    update, Effect, JobOutcome, Msg, PollTiming, PollerState, PollerView, RunId, RunPhase,
};
use valid8_logging::{valid8_debug, valid8_info, valid8_warn};

use crate::{Clock, JobApi, UploadFile};

/// Receives a snapshot whenever the run's visible state changes.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, view: PollerView);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<PollerView>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<PollerView>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, view: PollerView) {
        let _ = self.tx.send(view);
    }
}

/// Drives one submission/poll sequence: feeds messages through the pure
/// [`update`] function and executes the effects it returns, one at a time.
///
/// A poller runs at most once; create a new one for the next file.
pub struct JobPoller<A, C> {
    api: A,
    clock: C,
    state: PollerState,
    cancel: CancellationToken,
}

impl<A: JobApi, C: Clock> JobPoller<A, C> {
    pub fn new(api: A, clock: C, timing: PollTiming) -> Self {
        Self {
            api,
            clock,
            state: PollerState::new(timing),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the run when cancelled. Responses arriving afterwards are dropped.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn view(&self) -> PollerView {
        self.state.view()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Uploads `file` and polls until a terminal state.
    ///
    /// Returns `None` without doing anything if this poller already ran.
    pub async fn run(&mut self, file: &UploadFile, sink: &dyn ProgressSink) -> Option<JobOutcome> {
        if self.state.phase() != RunPhase::Idle {
            valid8_warn!("Poller already started; ignoring run for {}", file.name);
            return None;
        }

        let mut inbox = VecDeque::from([Msg::StartRequested {
            upload: file.info(),
            at_ms: self.clock.now_ms(),
        }]);
        while let Some(msg) = inbox.pop_front() {
            let (mut next, effects) = update(std::mem::take(&mut self.state), msg);
            let view = next.view();
            if next.consume_dirty() {
                sink.emit(view);
            }
            self.state = next;
            for effect in effects {
                if let Some(reply) = self.execute(effect, file).await {
                    inbox.push_back(reply);
                }
            }
        }

        let outcome = self.state.outcome();
        match &outcome {
            Some(JobOutcome::Completed { job_id, .. }) => {
                valid8_info!("Job {} completed", job_id)
            }
            Some(JobOutcome::Failed { error, .. }) => valid8_warn!("Job failed: {}", error),
            Some(JobOutcome::Cancelled { .. }) => valid8_info!("Job cancelled"),
            None => {}
        }
        outcome
    }

    async fn execute(&self, effect: Effect, file: &UploadFile) -> Option<Msg> {
        match effect {
            Effect::SubmitUpload { run } => {
                valid8_info!("Submitting {} ({} bytes)", file.name, file.size());
                let result = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Some(self.cancelled(run)),
                    result = self.api.start_job(file) => result,
                };
                let at_ms = self.clock.now_ms();
                Some(match result {
                    Ok(job_id) => {
                        valid8_info!("Job created job_id={}", job_id);
                        Msg::SubmitSucceeded { run, job_id, at_ms }
                    }
                    Err(err) => {
                        valid8_warn!("Job creation failed: {}", err);
                        Msg::SubmitFailed {
                            run,
                            message: err.user_message(),
                            at_ms,
                        }
                    }
                })
            }
            Effect::SchedulePoll { run, after } => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Some(self.cancelled(run)),
                    _ = self.clock.sleep(after) => Some(Msg::PollTick {
                        run,
                        at_ms: self.clock.now_ms(),
                    }),
                }
            }
            Effect::FetchStatus { run, job_id } => {
                let result = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Some(self.cancelled(run)),
                    result = self.api.job_status(&job_id) => result,
                };
                let at_ms = self.clock.now_ms();
                Some(match result {
                    Ok(response) => {
                        valid8_debug!(
                            "Status job_id={} stage={:?} progress={:?} status={:?}",
                            job_id,
                            response.stage,
                            response.progress,
                            response.status
                        );
                        Msg::StatusReceived {
                            run,
                            update: response.into_update(),
                            at_ms,
                        }
                    }
                    Err(err) => {
                        valid8_warn!("Status check for {} failed: {}", job_id, err);
                        Msg::PollFailed {
                            run,
                            message: err.to_string(),
                            at_ms,
                        }
                    }
                })
            }
            Effect::FinishAfter { run, after } => {
                // The result is already in hand; cancelling only skips the delay.
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {}
                    _ = self.clock.sleep(after) => {}
                }
                Some(Msg::FinishElapsed {
                    run,
                    at_ms: self.clock.now_ms(),
                })
            }
        }
    }

    fn cancelled(&self, run: RunId) -> Msg {
        Msg::CancelRequested {
            run,
            at_ms: self.clock.now_ms(),
        }
    }
}

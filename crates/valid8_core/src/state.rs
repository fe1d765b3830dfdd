use std::time::Duration;

use crate::view_model::PollerView;
use crate::{Effect, RemoteStatus, StatusUpdate, ValidationResults};

/// Identifies one submission/poll sequence. Zero means "never started".
pub type RunId = u64;

/// Backend pipeline phase, ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Uploading,
    Ingestion,
    Validation,
    Finalizing,
    Completed,
    Failed,
}

impl Stage {
    /// Parses a backend stage name. Unknown names yield `None`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uploading" => Some(Self::Uploading),
            "ingestion" => Some(Self::Ingestion),
            "validation" => Some(Self::Validation),
            "finalizing" => Some(Self::Finalizing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Ingestion => "ingestion",
            Self::Validation => "validation",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn announcement(self) -> Option<&'static str> {
        match self {
            Self::Ingestion => Some("Ingesting provider records"),
            Self::Validation => Some("Validating providers against registries"),
            Self::Finalizing => Some("Finalizing results"),
            Self::Uploading | Self::Completed | Self::Failed => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    /// Result received; holding 100% before reporting completion.
    Finishing,
    Completed,
    Failed,
    Cancelled,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Name and size of the file being validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInfo {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub poll_interval: Duration,
    pub finish_delay: Duration,
    /// `None` polls until the backend reaches a terminal state.
    pub max_poll_duration: Option<Duration>,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            finish_delay: Duration::from_millis(800),
            max_poll_duration: Some(Duration::from_secs(600)),
        }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        job_id: String,
        results: ValidationResults,
        duration_ms: u64,
    },
    Failed {
        job_id: Option<String>,
        error: String,
        duration_ms: u64,
    },
    Cancelled {
        job_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollerState {
    timing: PollTiming,
    run: RunId,
    phase: RunPhase,
    upload: Option<UploadInfo>,
    job_id: Option<String>,
    stage: Stage,
    progress: u8,
    log: Vec<LogEntry>,
    error: Option<String>,
    result: Option<ValidationResults>,
    started_at_ms: u64,
    polling_since_ms: u64,
    finished_at_ms: u64,
    poll_in_flight: bool,
    dirty: bool,
}

impl PollerState {
    pub fn new(timing: PollTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn view(&self) -> PollerView {
        PollerView {
            phase: self.phase,
            stage: self.stage,
            progress: self.progress,
            upload: self.upload.clone(),
            job_id: self.job_id.clone(),
            log: self.log.clone(),
            error: self.error.clone(),
            dirty: self.dirty,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// The terminal outcome, once the run has reached one.
    pub fn outcome(&self) -> Option<JobOutcome> {
        let duration_ms = self.finished_at_ms.saturating_sub(self.started_at_ms);
        match self.phase {
            RunPhase::Completed => Some(JobOutcome::Completed {
                job_id: self.job_id.clone().unwrap_or_default(),
                results: self.result.clone().unwrap_or_default(),
                duration_ms,
            }),
            RunPhase::Failed => Some(JobOutcome::Failed {
                job_id: self.job_id.clone(),
                error: self.error.clone().unwrap_or_default(),
                duration_ms,
            }),
            RunPhase::Cancelled => Some(JobOutcome::Cancelled {
                job_id: self.job_id.clone(),
            }),
            RunPhase::Idle | RunPhase::Submitting | RunPhase::Polling | RunPhase::Finishing => {
                None
            }
        }
    }

    /// True when `run` is the current run and the state is in `phase`.
    pub(crate) fn accepts(&self, run: RunId, phase: RunPhase) -> bool {
        self.run != 0 && self.run == run && self.phase == phase
    }

    pub(crate) fn current_job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub(crate) fn poll_in_flight(&self) -> bool {
        self.poll_in_flight
    }

    pub(crate) fn begin_run(&mut self, upload: UploadInfo, at_ms: u64) -> RunId {
        self.run += 1;
        self.phase = RunPhase::Submitting;
        self.stage = Stage::Uploading;
        self.started_at_ms = at_ms;
        self.push_log(
            at_ms,
            format!("Uploading {} ({} bytes)", upload.name, upload.size),
        );
        self.upload = Some(upload);
        self.mark_dirty();
        self.run
    }

    pub(crate) fn start_polling(&mut self, job_id: String, at_ms: u64) {
        self.phase = RunPhase::Polling;
        self.polling_since_ms = at_ms;
        self.push_log(at_ms, format!("Job created: {job_id}"));
        self.job_id = Some(job_id);
        self.mark_dirty();
    }

    pub(crate) fn mark_poll_in_flight(&mut self) {
        self.poll_in_flight = true;
    }

    pub(crate) fn poll_deadline_passed(&self, at_ms: u64) -> bool {
        match self.timing.max_poll_duration {
            Some(limit) => {
                u128::from(at_ms.saturating_sub(self.polling_since_ms)) >= limit.as_millis()
            }
            None => false,
        }
    }

    pub(crate) fn apply_status(&mut self, update: StatusUpdate, at_ms: u64) -> Vec<Effect> {
        self.poll_in_flight = false;
        if let Some(progress) = update.progress {
            self.raise_progress(progress);
        }
        if let Some(stage) = update.stage {
            self.enter_stage(stage, at_ms);
        }
        self.mark_dirty();

        match update.status {
            RemoteStatus::Running => vec![Effect::SchedulePoll {
                run: self.run,
                after: self.timing.poll_interval,
            }],
            RemoteStatus::Failed => {
                let error = update
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Validation failed".to_string());
                self.fail(error, at_ms);
                Vec::new()
            }
            RemoteStatus::Completed => {
                self.progress = 100;
                self.stage = Stage::Completed;
                self.result = Some(update.result.unwrap_or_default());
                self.phase = RunPhase::Finishing;
                self.push_log(at_ms, "Validation complete".to_string());
                vec![Effect::FinishAfter {
                    run: self.run,
                    after: self.timing.finish_delay,
                }]
            }
        }
    }

    pub(crate) fn record_poll_failure(&mut self, message: &str, at_ms: u64) {
        self.poll_in_flight = false;
        self.push_log(at_ms, format!("Status check failed: {message}"));
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, error: String, at_ms: u64) {
        self.phase = RunPhase::Failed;
        self.stage = Stage::Failed;
        self.poll_in_flight = false;
        self.finished_at_ms = at_ms;
        self.push_log(at_ms, format!("Error: {error}"));
        self.error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn complete(&mut self, at_ms: u64) {
        self.phase = RunPhase::Completed;
        self.finished_at_ms = at_ms;
        self.mark_dirty();
    }

    pub(crate) fn cancel(&mut self, at_ms: u64) {
        self.phase = RunPhase::Cancelled;
        self.poll_in_flight = false;
        self.finished_at_ms = at_ms;
        self.push_log(at_ms, "Validation cancelled".to_string());
        self.mark_dirty();
    }

    /// Server progress is not monotonic on the wire; never display less than before.
    fn raise_progress(&mut self, reported: f64) {
        if !reported.is_finite() {
            return;
        }
        let clamped = reported.round().clamp(0.0, 100.0) as u8;
        self.progress = self.progress.max(clamped);
    }

    /// Stages only move forward; terminal stages are set by the status, not here.
    fn enter_stage(&mut self, stage: Stage, at_ms: u64) {
        if stage.is_terminal() || stage <= self.stage {
            return;
        }
        self.stage = stage;
        if let Some(line) = stage.announcement() {
            self.push_log(at_ms, line.to_string());
        }
    }

    fn push_log(&mut self, at_ms: u64, text: String) {
        if self.log.last().is_some_and(|last| last.text == text) {
            return;
        }
        self.log.push(LogEntry { at_ms, text });
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

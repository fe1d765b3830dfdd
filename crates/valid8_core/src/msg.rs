use crate::{RunId, Stage, UploadInfo, ValidationResults};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Caller picked a file and asked for validation.
    StartRequested { upload: UploadInfo, at_ms: u64 },
    /// Job-creation endpoint accepted the upload.
    SubmitSucceeded {
        run: RunId,
        job_id: String,
        at_ms: u64,
    },
    /// Job creation failed (transport error or non-success response).
    SubmitFailed {
        run: RunId,
        message: String,
        at_ms: u64,
    },
    /// Poll timer fired.
    PollTick { run: RunId, at_ms: u64 },
    /// Status endpoint answered.
    StatusReceived {
        run: RunId,
        update: StatusUpdate,
        at_ms: u64,
    },
    /// Status request failed in transport; polling continues.
    PollFailed {
        run: RunId,
        message: String,
        at_ms: u64,
    },
    /// Completion delay elapsed.
    FinishElapsed { run: RunId, at_ms: u64 },
    /// Caller asked to stop watching the job.
    CancelRequested { run: RunId, at_ms: u64 },
}

/// Server-reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Running,
    Completed,
    Failed,
}

/// One status snapshot, already checked against the result schema.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// `None` when the backend reported a stage outside the known set.
    pub stage: Option<Stage>,
    pub progress: Option<f64>,
    pub status: RemoteStatus,
    pub error: Option<String>,
    pub result: Option<ValidationResults>,
}

impl StatusUpdate {
    pub fn running(stage: Stage, progress: f64) -> Self {
        Self {
            stage: Some(stage),
            progress: Some(progress),
            status: RemoteStatus::Running,
            error: None,
            result: None,
        }
    }

    pub fn completed(result: ValidationResults) -> Self {
        Self {
            stage: Some(Stage::Completed),
            progress: Some(100.0),
            status: RemoteStatus::Completed,
            error: None,
            result: Some(result),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            stage: Some(Stage::Failed),
            progress: None,
            status: RemoteStatus::Failed,
            error: Some(error.into()),
            result: None,
        }
    }
}

use std::time::Duration;

use crate::RunId;

/// Side effects requested by [`crate::update`]; executed by the engine's
/// poller driver, which answers with the matching [`crate::Msg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the upload to the job-creation endpoint.
    SubmitUpload { run: RunId },
    /// Wake up with `Msg::PollTick` after `after`.
    SchedulePoll { run: RunId, after: Duration },
    /// Request one status snapshot for `job_id`.
    FetchStatus { run: RunId, job_id: String },
    /// Hold the completed view for `after`, then send `Msg::FinishElapsed`.
    FinishAfter { run: RunId, after: Duration },
}

//! Valid8 core: pure job-poller state machine, typed result payloads and
//! history records.
mod effect;
mod history;
mod msg;
mod results;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use history::{HistorySummary, JobStats, JobStatus, ValidationJob};
pub use msg::{Msg, RemoteStatus, StatusUpdate};
pub use results::{CleanedProvider, ValidatedProvider, ValidationResults};
pub use state::{JobOutcome, LogEntry, PollTiming, PollerState, RunId, RunPhase, Stage, UploadInfo};
pub use update::update;
pub use view_model::PollerView;

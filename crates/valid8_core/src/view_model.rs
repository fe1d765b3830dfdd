use crate::{LogEntry, RunPhase, Stage, UploadInfo};

/// Read-only snapshot of a poller run, handed to progress sinks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollerView {
    pub phase: RunPhase,
    pub stage: Stage,
    pub progress: u8,
    pub upload: Option<UploadInfo>,
    pub job_id: Option<String>,
    pub log: Vec<LogEntry>,
    pub error: Option<String>,
    pub dirty: bool,
}

impl PollerView {
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn last_log(&self) -> Option<&LogEntry> {
        self.log.last()
    }
}

//! Valid8 engine: backend job API, poller driver, history persistence and export.
mod api;
mod clock;
mod export;
mod history;
mod kv;
mod persist;
mod poller;
mod seed;
mod types;

pub use api::{ApiSettings, JobApi, ReqwestJobApi};
pub use clock::{Clock, ManualClock, SystemClock};
pub use export::{export_structured, export_tabular, ExportError, ExportWriter, CSV_DELIMITER};
pub use history::{
    spawn_seeding, HistoryStore, SeedOutcome, SeedState, StorageStats, HISTORY_KEY, MAX_JOBS,
    SEEDED_KEY, SEED_ATTEMPT_KEY, SEED_RETRY_INTERVAL,
};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{ChannelProgressSink, JobPoller, ProgressSink};
pub use seed::{parse_seed, FileSeedSource, HttpSeedSource, SeedError, SeedSource};
pub use types::{ApiError, StartJobResponse, StatusResponse, UploadFile};

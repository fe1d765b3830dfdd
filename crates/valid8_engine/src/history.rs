//! Bounded, most-recent-first history of finished validation jobs.
//!
//! Storage failures never reach the caller: they are logged and the read
//! path falls back to an empty history.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use valid8_core::{HistorySummary, ValidationJob};
use valid8_logging::{valid8_debug, valid8_error, valid8_info, valid8_warn};

use crate::clock::{Clock, SystemClock};
use crate::kv::{KeyValueStore, StoreError};
use crate::seed::SeedSource;

pub const HISTORY_KEY: &str = "valid8_history";
pub const SEEDED_KEY: &str = "valid8_seeded";
/// Epoch milliseconds of the last seed attempt that adopted nothing.
pub const SEED_ATTEMPT_KEY: &str = "valid8_seed_attempt";
pub const MAX_JOBS: usize = 100;
/// Minimum wait after an unsuccessful seed attempt before fetching again.
pub const SEED_RETRY_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Progress of the one-shot seeding step for a store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedState {
    #[default]
    NotStarted,
    InFlight,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The seeded marker was already set.
    AlreadySeeded,
    /// History existed, so the snapshot was not needed.
    HistoryPresent,
    /// The snapshot was adopted with this many records.
    Adopted(usize),
    /// The snapshot held no records; nothing was stored.
    Empty,
    /// Fetching or storing the snapshot failed; history stays as it was.
    Failed,
    /// A recent attempt adopted nothing; the source was not contacted.
    RetryLater,
    /// Seeding already ran or is running for this store.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    pub count: usize,
    /// Serialized history size, rounded to the nearest kilobyte.
    pub size_kb: u64,
}

pub struct HistoryStore<S> {
    store: S,
    clock: Arc<dyn Clock>,
    seed_state: Mutex<SeedState>,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Uses `clock` to time seed retries.
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            seed_state: Mutex::new(SeedState::NotStarted),
        }
    }

    /// Prepends `job`, dropping the oldest records beyond [`MAX_JOBS`].
    pub fn save(&self, job: ValidationJob) {
        let mut jobs = self.list();
        let job_id = job.job_id.clone();
        jobs.insert(0, job);
        jobs.truncate(MAX_JOBS);
        match self.write(&jobs) {
            Ok(()) => valid8_info!("Saved validation job {} ({} in history)", job_id, jobs.len()),
            Err(err) => valid8_error!("Failed to save validation job {}: {}", job_id, err),
        }
    }

    /// All records, most recent first.
    pub fn list(&self) -> Vec<ValidationJob> {
        match self.read() {
            Ok(Some(jobs)) => jobs,
            Ok(None) => Vec::new(),
            Err(err) => {
                valid8_error!("Failed to retrieve validation history: {}", err);
                Vec::new()
            }
        }
    }

    pub fn get_by_id(&self, job_id: &str) -> Option<ValidationJob> {
        self.list().into_iter().find(|job| job.job_id == job_id)
    }

    /// Removes the first record with `job_id`; unknown ids are ignored.
    pub fn delete(&self, job_id: &str) {
        let mut jobs = self.list();
        let Some(index) = jobs.iter().position(|job| job.job_id == job_id) else {
            valid8_debug!("Delete ignored, no validation job {}", job_id);
            return;
        };
        jobs.remove(index);
        if let Err(err) = self.write(&jobs) {
            valid8_error!("Failed to delete validation job {}: {}", job_id, err);
        }
    }

    /// Drops every record. The seeded marker is kept, so seeding does not run again.
    pub fn clear_all(&self) {
        if let Err(err) = self.store.remove(HISTORY_KEY) {
            valid8_error!("Failed to clear history: {}", err);
        }
    }

    pub fn stats(&self) -> StorageStats {
        let size_bytes = match self.store.get(HISTORY_KEY) {
            Ok(raw) => raw.map_or(0, |text| text.len() as u64),
            Err(err) => {
                valid8_error!("Failed to get storage stats: {}", err);
                return StorageStats::default();
            }
        };
        StorageStats {
            count: self.list().len(),
            size_kb: (size_bytes + 512) / 1024,
        }
    }

    pub fn search(&self, query: &str) -> Vec<ValidationJob> {
        self.list()
            .into_iter()
            .filter(|job| job.matches(query))
            .collect()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary::from_jobs(&self.list())
    }

    pub fn seed_state(&self) -> SeedState {
        *self.lock_seed_state()
    }

    /// Populates an empty, never-seeded history from `source`, at most once
    /// per store instance.
    ///
    /// The snapshot is only adopted if no history was written while it was
    /// being fetched. A failed or empty fetch is recorded in the store, and
    /// later stores wait [`SEED_RETRY_INTERVAL`] before trying again.
    pub async fn ensure_seeded(&self, source: &dyn SeedSource) -> SeedOutcome {
        {
            let mut state = self.lock_seed_state();
            if *state != SeedState::NotStarted {
                return SeedOutcome::Skipped;
            }
            *state = SeedState::InFlight;
        }
        let outcome = self.seed_from(source).await;
        *self.lock_seed_state() = SeedState::Done;
        outcome
    }

    async fn seed_from(&self, source: &dyn SeedSource) -> SeedOutcome {
        match self.store.get(SEEDED_KEY) {
            Ok(Some(_)) => return SeedOutcome::AlreadySeeded,
            Ok(None) => {}
            Err(err) => {
                valid8_error!("Failed to read seed marker: {}", err);
                return SeedOutcome::Failed;
            }
        }
        if self.history_present() {
            self.mark_seeded();
            return SeedOutcome::HistoryPresent;
        }
        if self.retry_pending() {
            valid8_debug!("Recent seed attempt adopted nothing; not fetching again yet");
            return SeedOutcome::RetryLater;
        }

        let mut jobs = match source.fetch().await {
            Ok(jobs) => jobs,
            Err(err) => {
                valid8_warn!("Failed to load seed data: {}", err);
                self.record_attempt();
                return SeedOutcome::Failed;
            }
        };

        if self.history_present() {
            self.mark_seeded();
            return SeedOutcome::HistoryPresent;
        }
        if jobs.is_empty() {
            valid8_info!("Seed snapshot is empty; nothing to adopt");
            self.record_attempt();
            return SeedOutcome::Empty;
        }
        jobs.truncate(MAX_JOBS);
        if let Err(err) = self.write(&jobs) {
            valid8_error!("Failed to store seed data: {}", err);
            self.record_attempt();
            return SeedOutcome::Failed;
        }
        self.mark_seeded();
        valid8_info!("Loaded seed history data: {} jobs", jobs.len());
        SeedOutcome::Adopted(jobs.len())
    }

    fn retry_pending(&self) -> bool {
        let last = match self.store.get(SEED_ATTEMPT_KEY) {
            Ok(Some(raw)) => raw.trim().parse::<u64>().ok(),
            Ok(None) => None,
            Err(err) => {
                valid8_warn!("Failed to read seed attempt: {}", err);
                None
            }
        };
        last.is_some_and(|at_ms| {
            u128::from(self.clock.now_ms().saturating_sub(at_ms)) < SEED_RETRY_INTERVAL.as_millis()
        })
    }

    fn record_attempt(&self) {
        let now = self.clock.now_ms().to_string();
        if let Err(err) = self.store.set(SEED_ATTEMPT_KEY, &now) {
            valid8_error!("Failed to record seed attempt: {}", err);
        }
    }

    fn history_present(&self) -> bool {
        matches!(self.store.get(HISTORY_KEY), Ok(Some(_)))
    }

    fn mark_seeded(&self) {
        if let Err(err) = self.store.set(SEEDED_KEY, "true") {
            valid8_error!("Failed to write seed marker: {}", err);
        }
        if let Err(err) = self.store.remove(SEED_ATTEMPT_KEY) {
            valid8_warn!("Failed to clear seed attempt: {}", err);
        }
    }

    /// `Ok(None)` when nothing is stored. Corrupted content reads as empty.
    fn read(&self) -> Result<Option<Vec<ValidationJob>>, StoreError> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<ValidationJob>>(&raw) {
            Ok(jobs) => Ok(Some(jobs)),
            Err(err) => {
                valid8_warn!("Stored history is corrupted, treating as empty: {}", err);
                Ok(Some(Vec::new()))
            }
        }
    }

    fn write(&self, jobs: &[ValidationJob]) -> Result<(), HistoryWriteError> {
        let raw = serde_json::to_string(jobs)?;
        self.store.set(HISTORY_KEY, &raw)?;
        Ok(())
    }

    fn lock_seed_state(&self) -> std::sync::MutexGuard<'_, SeedState> {
        self.seed_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, thiserror::Error)]
enum HistoryWriteError {
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs [`HistoryStore::ensure_seeded`] in the background; `list()` keeps
/// answering from whatever is stored until the task finishes.
pub fn spawn_seeding<S>(
    history: Arc<HistoryStore<S>>,
    source: Arc<dyn SeedSource>,
) -> tokio::task::JoinHandle<SeedOutcome>
where
    S: KeyValueStore + 'static,
{
    tokio::spawn(async move { history.ensure_seeded(source.as_ref()).await })
}

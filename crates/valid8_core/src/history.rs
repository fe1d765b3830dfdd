use serde::{Deserialize, Serialize};

use crate::{JobOutcome, UploadInfo, ValidationResults};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Summary counts derived from a job's results when the record is created.
///
/// `valid_count + invalid_count == total_providers` always holds; stored
/// records are normalized on load.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredStats")]
pub struct JobStats {
    total_providers: u64,
    valid_count: u64,
    invalid_count: u64,
    avg_confidence: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredStats {
    #[serde(default)]
    total_providers: u64,
    #[serde(default)]
    valid_count: u64,
    #[serde(default)]
    avg_confidence: f64,
}

impl From<StoredStats> for JobStats {
    fn from(stored: StoredStats) -> Self {
        Self::new(
            stored.total_providers,
            stored.valid_count,
            stored.avg_confidence,
        )
    }
}

impl JobStats {
    /// Builds consistent stats; `valid` is clamped to `total`.
    pub fn new(total: u64, valid: u64, avg_confidence: f64) -> Self {
        let valid = valid.min(total);
        let avg_confidence = if avg_confidence.is_finite() {
            avg_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            total_providers: total,
            valid_count: valid,
            invalid_count: total - valid,
            avg_confidence,
        }
    }

    pub fn from_results(results: &ValidationResults) -> Self {
        let providers = &results.validated_providers;
        let total = providers.len() as u64;
        let valid = results.verified_count() as u64;
        let confidence_sum: f64 = providers
            .iter()
            .map(|p| p.overall_confidence().unwrap_or(0.0))
            .sum();
        Self::new(total, valid, confidence_sum / total.max(1) as f64)
    }

    pub fn total_providers(&self) -> u64 {
        self.total_providers
    }

    pub fn valid_count(&self) -> u64 {
        self.valid_count
    }

    pub fn invalid_count(&self) -> u64 {
        self.invalid_count
    }

    /// Mean overall confidence as a fraction in `0.0..=1.0`.
    pub fn avg_confidence(&self) -> f64 {
        self.avg_confidence
    }
}

/// Persisted summary of one finished validation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationJob {
    pub job_id: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: u64,
    pub file_name: String,
    pub file_size: u64,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ValidationResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub stats: JobStats,
}

impl ValidationJob {
    pub fn completed(
        job_id: impl Into<String>,
        upload: &UploadInfo,
        timestamp: u64,
        duration: Option<u64>,
        results: ValidationResults,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            timestamp,
            file_name: upload.name.clone(),
            file_size: upload.size,
            status: JobStatus::Completed,
            duration,
            stats: JobStats::from_results(&results),
            results: Some(results),
            error: None,
        }
    }

    pub fn failed(
        job_id: impl Into<String>,
        upload: &UploadInfo,
        timestamp: u64,
        duration: Option<u64>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            timestamp,
            file_name: upload.name.clone(),
            file_size: upload.size,
            status: JobStatus::Failed,
            duration,
            results: None,
            error: Some(error.into()),
            stats: JobStats::default(),
        }
    }

    /// Packages a terminal poller outcome for the history. Cancelled runs
    /// are not recorded.
    pub fn from_outcome(upload: &UploadInfo, timestamp: u64, outcome: &JobOutcome) -> Option<Self> {
        match outcome {
            JobOutcome::Completed {
                job_id,
                results,
                duration_ms,
            } => Some(Self::completed(
                job_id.clone(),
                upload,
                timestamp,
                Some(*duration_ms),
                results.clone(),
            )),
            JobOutcome::Failed {
                job_id,
                error,
                duration_ms,
            } => {
                let job_id = job_id
                    .clone()
                    .unwrap_or_else(|| format!("job_{timestamp}"));
                Some(Self::failed(
                    job_id,
                    upload,
                    timestamp,
                    Some(*duration_ms),
                    error.clone(),
                ))
            }
            JobOutcome::Cancelled { .. } => None,
        }
    }

    /// Case-insensitive match on file name, job id or status. A blank query
    /// matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.file_name.to_lowercase().contains(&query)
            || self.job_id.to_lowercase().contains(&query)
            || self.status.as_str().contains(&query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistorySummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Completed jobs as a percentage of all jobs; 0 for an empty history.
    pub success_rate: f64,
}

impl HistorySummary {
    pub fn from_jobs(jobs: &[ValidationJob]) -> Self {
        let completed = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count();
        let failed = jobs.len() - completed;
        let success_rate = if jobs.is_empty() {
            0.0
        } else {
            completed as f64 / jobs.len() as f64 * 100.0
        };
        Self {
            total: jobs.len(),
            completed,
            failed,
            success_rate,
        }
    }
}

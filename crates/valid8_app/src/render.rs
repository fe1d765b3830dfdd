//! Terminal output for progress snapshots and history records.

use std::fmt::Write as _;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use valid8_core::{HistorySummary, JobStatus, LogEntry, PollerView, ValidationJob};
use valid8_engine::{ProgressSink, StorageStats};

/// Prints log lines as they appear and the progress bar when it moves.
#[derive(Default)]
pub struct TerminalSink {
    printed: Mutex<Printed>,
}

#[derive(Default)]
struct Printed {
    log_lines: usize,
    progress: Option<u8>,
}

impl ProgressSink for TerminalSink {
    fn emit(&self, view: PollerView) {
        let mut printed = self
            .printed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for entry in view.log.iter().skip(printed.log_lines) {
            println!("{}", log_line(entry));
        }
        printed.log_lines = view.log.len();
        if printed.progress != Some(view.progress) && !view.is_terminal() {
            println!("{}", progress_bar(&view));
            printed.progress = Some(view.progress);
        }
    }
}

fn local_time(at_ms: u64) -> Option<DateTime<Local>> {
    let at_ms = i64::try_from(at_ms).ok()?;
    DateTime::from_timestamp_millis(at_ms).map(|utc| utc.with_timezone(&Local))
}

pub fn clock_time(at_ms: u64) -> String {
    local_time(at_ms)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

pub fn date_time(at_ms: u64) -> String {
    local_time(at_ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn log_line(entry: &LogEntry) -> String {
    format!("[{}] {}", clock_time(entry.at_ms), entry.text)
}

const BAR_WIDTH: usize = 30;

pub fn progress_bar(view: &PollerView) -> String {
    let filled = usize::from(view.progress) * BAR_WIDTH / 100;
    format!(
        "  [{}{}] {:>3}% {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        view.progress,
        view.stage.as_str()
    )
}

pub fn duration(ms: u64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        format!("{}.{}s", secs, (ms % 1000) / 100)
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

pub fn job_row(job: &ValidationJob) -> String {
    let outcome = match job.status {
        JobStatus::Completed => format!(
            "{}/{} valid",
            job.stats.valid_count(),
            job.stats.total_providers()
        ),
        JobStatus::Failed => job.error.clone().unwrap_or_default(),
    };
    format!(
        "{:<24} {:<16} {:<9} {:<28} {}",
        job.job_id,
        date_time(job.timestamp),
        job.status.as_str(),
        job.file_name,
        outcome
    )
}

pub fn job_detail(job: &ValidationJob) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job:        {}", job.job_id);
    let _ = writeln!(out, "Submitted:  {}", date_time(job.timestamp));
    let _ = writeln!(out, "File:       {} ({} bytes)", job.file_name, job.file_size);
    let _ = writeln!(out, "Status:     {}", job.status.as_str());
    if let Some(ms) = job.duration {
        let _ = writeln!(out, "Duration:   {}", duration(ms));
    }
    if let Some(error) = &job.error {
        let _ = writeln!(out, "Error:      {error}");
    }
    let _ = writeln!(
        out,
        "Providers:  {} total, {} valid, {} need review",
        job.stats.total_providers(),
        job.stats.valid_count(),
        job.stats.invalid_count()
    );
    let _ = write!(
        out,
        "Confidence: {:.0}%",
        job.stats.avg_confidence() * 100.0
    );
    out
}

pub fn storage_report(stats: StorageStats, summary: HistorySummary) -> String {
    format!(
        "{} jobs ({} completed, {} failed), success rate {:.1}%, {} KB stored",
        stats.count, summary.completed, summary.failed, summary.success_rate, stats.size_kb
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use valid8_core::{RunPhase, Stage, UploadInfo, ValidationResults};

    fn upload() -> UploadInfo {
        UploadInfo {
            name: "roster.csv".to_string(),
            size: 1200,
        }
    }

    #[test]
    fn progress_bar_scales_with_percentage() {
        let view = PollerView {
            phase: RunPhase::Polling,
            stage: Stage::Validation,
            progress: 50,
            ..PollerView::default()
        };
        assert_eq!(
            progress_bar(&view),
            format!("  [{}{}]  50% validation", "#".repeat(15), "-".repeat(15))
        );
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(duration(800), "0.8s");
        assert_eq!(duration(42_350), "42.3s");
        assert_eq!(duration(125_000), "2m 05s");
    }

    #[test]
    fn log_lines_carry_clock_prefix() {
        let line = log_line(&LogEntry {
            at_ms: 1_700_000_000_000,
            text: "Job created: abc".to_string(),
        });
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Job created: abc"));
        assert_eq!(line.find(']'), Some(9));
    }

    #[test]
    fn failed_row_shows_error() {
        let job = ValidationJob::failed("job_1", &upload(), 1_700_000_000_000, None, "Bad CSV header");
        let row = job_row(&job);
        assert!(row.starts_with("job_1 "));
        assert!(row.contains("failed"));
        assert!(row.ends_with("Bad CSV header"));
    }

    #[test]
    fn detail_lists_stats() {
        let job = ValidationJob::completed(
            "job_2",
            &upload(),
            1_700_000_000_000,
            Some(3_000),
            ValidationResults::default(),
        );
        let detail = job_detail(&job);
        assert!(detail.contains("Duration:   3.0s"));
        assert!(detail.contains("Providers:  0 total, 0 valid, 0 need review"));
        assert!(!detail.contains("Error:"));
    }
}

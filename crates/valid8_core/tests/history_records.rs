use pretty_assertions::assert_eq;
use serde_json::json;
use valid8_core::{
    HistorySummary, JobOutcome, JobStats, JobStatus, UploadInfo, ValidationJob, ValidationResults,
};

fn upload() -> UploadInfo {
    UploadInfo {
        name: "Roster_Q4.csv".to_string(),
        size: 5120,
    }
}

fn sample_results() -> ValidationResults {
    ValidationResults::from_value(json!({
        "cleaned_providers": [
            {"provider_id": "P1", "name": "Dr. A", "confidence": {"name": 0.9}, "source_row": 1},
            {"provider_id": "P2", "name": "Dr. B", "confidence": {"name": 0.7}, "source_row": 2}
        ],
        "validated_providers": [
            {"requires_manual_review": false, "confidence_scores": {"overall": 0.9}},
            {"requires_manual_review": true, "confidence_scores": {"overall": 0.5}, "discrepancies": ["Missing NPI Number"]},
            {"requires_manual_review": false}
        ],
        "processing_notes": ["sampled 3 rows"]
    }))
    .expect("valid payload")
}

#[test]
fn stats_are_derived_from_validated_providers() {
    let stats = JobStats::from_results(&sample_results());
    assert_eq!(stats.total_providers(), 3);
    assert_eq!(stats.valid_count(), 2);
    assert_eq!(stats.invalid_count(), 1);
    assert!((stats.avg_confidence() - (1.4 / 3.0)).abs() < 1e-9);
}

#[test]
fn empty_results_give_zero_stats() {
    let stats = JobStats::from_results(&ValidationResults::default());
    assert_eq!(stats, JobStats::new(0, 0, 0.0));
}

#[test]
fn malformed_payload_is_rejected() {
    let err = ValidationResults::from_value(json!({
        "validated_providers": [{"requires_manual_review": "maybe"}]
    }));
    assert!(err.is_err());
}

#[test]
fn unknown_result_keys_survive_round_trip() {
    let results = sample_results();
    let value = serde_json::to_value(&results).unwrap();
    assert_eq!(value["processing_notes"], json!(["sampled 3 rows"]));
}

#[test]
fn records_use_camel_case_layout() {
    let job = ValidationJob::completed("job-1", &upload(), 1_700_000_000_000, Some(4200), sample_results());
    let value = serde_json::to_value(&job).unwrap();
    assert_eq!(value["jobId"], "job-1");
    assert_eq!(value["fileName"], "Roster_Q4.csv");
    assert_eq!(value["fileSize"], 5120);
    assert_eq!(value["status"], "completed");
    assert_eq!(value["stats"]["totalProviders"], 3);
    assert_eq!(value["stats"]["invalidCount"], 1);
    assert!(value.get("error").is_none());
}

#[test]
fn stored_stats_are_normalized_on_load() {
    let job: ValidationJob = serde_json::from_value(json!({
        "jobId": "seed-1",
        "timestamp": 1,
        "fileName": "a.csv",
        "fileSize": 10,
        "status": "completed",
        "stats": {"totalProviders": 10, "validCount": 14, "invalidCount": 3, "avgConfidence": 0.8}
    }))
    .unwrap();
    assert_eq!(job.stats.valid_count(), 10);
    assert_eq!(job.stats.invalid_count(), 0);
    assert_eq!(
        job.stats.valid_count() + job.stats.invalid_count(),
        job.stats.total_providers()
    );
}

#[test]
fn outcome_packaging() {
    let completed = JobOutcome::Completed {
        job_id: "job-9".to_string(),
        results: sample_results(),
        duration_ms: 900,
    };
    let job = ValidationJob::from_outcome(&upload(), 77, &completed).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.duration, Some(900));
    assert_eq!(job.stats.total_providers(), 3);

    let failed = JobOutcome::Failed {
        job_id: None,
        error: "Network error".to_string(),
        duration_ms: 12,
    };
    let job = ValidationJob::from_outcome(&upload(), 77, &failed).unwrap();
    assert_eq!(job.job_id, "job_77");
    assert_eq!(job.error.as_deref(), Some("Network error"));
    assert_eq!(job.stats, JobStats::default());

    let cancelled = JobOutcome::Cancelled { job_id: None };
    assert!(ValidationJob::from_outcome(&upload(), 77, &cancelled).is_none());
}

#[test]
fn search_matches_name_id_and_status() {
    let job = ValidationJob::failed("JOB-abc", &upload(), 1, None, "boom");
    assert!(job.matches("roster"));
    assert!(job.matches("abc"));
    assert!(job.matches("FAILED"));
    assert!(job.matches("   "));
    assert!(!job.matches("completed"));
}

#[test]
fn summary_counts_and_rate() {
    let jobs = vec![
        ValidationJob::completed("a", &upload(), 1, None, ValidationResults::default()),
        ValidationJob::completed("b", &upload(), 2, None, ValidationResults::default()),
        ValidationJob::failed("c", &upload(), 3, None, "x"),
        ValidationJob::completed("d", &upload(), 4, None, ValidationResults::default()),
    ];
    let summary = HistorySummary::from_jobs(&jobs);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 1);
    assert!((summary.success_rate - 75.0).abs() < f64::EPSILON);
    assert_eq!(HistorySummary::from_jobs(&[]).success_rate, 0.0);
}

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use valid8_core::{JobOutcome, ValidationJob};
use valid8_engine::{
    export_structured, export_tabular, spawn_seeding, Clock, ExportWriter, FileSeedSource,
    FileStore, HistoryStore, HttpSeedSource, JobPoller, ReqwestJobApi, SeedOutcome, SeedSource,
    SystemClock, UploadFile,
};
use valid8_logging::{valid8_debug, valid8_info, valid8_warn};

use crate::cli::HistoryCommand;
use crate::config::AppConfig;
use crate::render::{self, TerminalSink};

type History = HistoryStore<FileStore>;

/// Opens the history under the configured data directory and starts
/// seeding it in the background when a seed source is configured.
fn open_history(
    config: &AppConfig,
) -> Result<(Arc<History>, Option<tokio::task::JoinHandle<SeedOutcome>>)> {
    let history = Arc::new(HistoryStore::new(FileStore::new(&config.data_dir)));
    let seeding = seed_source(config)?.map(|source| spawn_seeding(history.clone(), source));
    Ok((history, seeding))
}

fn seed_source(config: &AppConfig) -> Result<Option<Arc<dyn SeedSource>>> {
    if let Some(path) = &config.seed_path {
        return Ok(Some(Arc::new(FileSeedSource::new(path))));
    }
    if let Some(url) = &config.seed_url {
        let source = HttpSeedSource::new(url.clone(), config.seed_timeout())
            .context("failed to build seed client")?;
        return Ok(Some(Arc::new(source)));
    }
    Ok(None)
}

async fn finish_seeding(seeding: Option<tokio::task::JoinHandle<SeedOutcome>>) {
    if let Some(handle) = seeding {
        match handle.await {
            Ok(outcome) => valid8_debug!("Seeding finished: {:?}", outcome),
            Err(err) => valid8_warn!("Seeding task failed: {}", err),
        }
    }
}

pub async fn validate(config: &AppConfig, path: &Path) -> Result<()> {
    let file =
        UploadFile::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (history, seeding) = open_history(config)?;

    let api = ReqwestJobApi::new(config.api_settings())?;
    let mut poller = JobPoller::new(api, SystemClock, config.poll_timing());
    let cancel = poller.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    println!("Validating {} against {}", file.name, config.api_base_url);
    let submitted_at = poller.clock().now_ms();
    let outcome = poller
        .run(&file, &TerminalSink::default())
        .await
        .ok_or_else(|| anyhow!("validation run did not start"))?;

    finish_seeding(seeding).await;
    if let Some(record) = ValidationJob::from_outcome(&file.info(), submitted_at, &outcome) {
        history.save(record);
    }

    match outcome {
        JobOutcome::Completed {
            job_id,
            results,
            duration_ms,
        } => {
            println!(
                "Validation complete in {}: {} providers, {} verified, {} need review (job {})",
                render::duration(duration_ms),
                results.validated_providers.len(),
                results.verified_count(),
                results.review_count(),
                job_id
            );
            Ok(())
        }
        JobOutcome::Failed { error, .. } => bail!("validation failed: {error}"),
        JobOutcome::Cancelled { .. } => {
            println!("Validation cancelled");
            Ok(())
        }
    }
}

pub async fn history(config: &AppConfig, command: HistoryCommand) -> Result<()> {
    let (history, seeding) = open_history(config)?;
    finish_seeding(seeding).await;

    match command {
        HistoryCommand::List { search } => {
            let jobs = match search.as_deref() {
                Some(query) => history.search(query),
                None => history.list(),
            };
            if jobs.is_empty() {
                println!("No validation jobs found");
            }
            for job in &jobs {
                println!("{}", render::job_row(job));
            }
        }
        HistoryCommand::Show { job_id } => {
            let job = find(&history, &job_id)?;
            println!("{}", render::job_detail(&job));
        }
        HistoryCommand::Delete { job_id } => println!("{}", delete_job(&history, &job_id)),
        HistoryCommand::Clear => {
            history.clear_all();
            println!("History cleared");
        }
        HistoryCommand::Stats => {
            println!(
                "{}",
                render::storage_report(history.stats(), history.summary())
            );
        }
        HistoryCommand::ExportJson { job_id, out } => {
            let job = find(&history, &job_id)?;
            let bytes = export_structured(&job)?;
            let path = ExportWriter::new(out).save(&format!("validation_{job_id}.json"), &bytes)?;
            println!("Wrote {}", path.display());
        }
        HistoryCommand::ExportCsv { job_id, out } => {
            let job = find(&history, &job_id)?;
            let providers = job
                .results
                .map(|results| results.cleaned_providers)
                .unwrap_or_default();
            match export_tabular(&providers)? {
                Some(bytes) => {
                    let path = ExportWriter::new(out)
                        .save(&format!("cleaned_providers_{job_id}.csv"), &bytes)?;
                    println!("Wrote {}", path.display());
                }
                None => println!("No data to export"),
            }
        }
    }
    valid8_info!("History command finished");
    Ok(())
}

/// Deletes `job_id` and describes what happened. An unknown id is not an error.
fn delete_job(history: &History, job_id: &str) -> String {
    if history.get_by_id(job_id).is_none() {
        return format!("No validation job with id {job_id}; nothing deleted");
    }
    history.delete(job_id);
    format!("Deleted {job_id}")
}

fn find(history: &History, job_id: &str) -> Result<ValidationJob> {
    history
        .get_by_id(job_id)
        .ok_or_else(|| anyhow!("no validation job with id {job_id}"))
}

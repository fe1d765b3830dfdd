use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "valid8")]
#[command(about = "Submit provider rosters for validation and browse past runs")]
pub struct Cli {
    /// RON configuration file; defaults to ./valid8.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a file and follow the validation job until it finishes.
    Validate { file: PathBuf },
    /// Inspect and manage the local validation history.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    List {
        /// Case-insensitive filter on file name, job id or status.
        #[arg(long)]
        search: Option<String>,
    },
    Show { job_id: String },
    Delete { job_id: String },
    Clear,
    Stats,
    /// Write the full record as indented JSON.
    ExportJson {
        job_id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Write the record's cleaned providers as CSV.
    ExportCsv {
        job_id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

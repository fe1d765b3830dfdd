mod cli;
mod commands;
mod config;
mod render;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use valid8_logging::LogDestination;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

const LOG_FILENAME: &str = "./valid8.log";

/// Picks where logs go and how much is kept.
///
/// The log file keeps at least info. With `-v` and a log file, output goes to
/// both the file and the terminal.
fn log_target(log_to_file: bool, verbose: u8) -> (LogDestination, LevelFilter) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    match (log_to_file, verbose) {
        (false, _) => (LogDestination::Terminal, level),
        (true, 0) => (LogDestination::File, level.max(LevelFilter::Info)),
        (true, _) => (LogDestination::Both, level),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (destination, level) = log_target(config.log_to_file, cli.verbose);
    valid8_logging::initialize(destination, level, Path::new(LOG_FILENAME));

    let result = match cli.command {
        Command::Validate { file } => commands::validate(&config, &file).await,
        Command::History { command } => commands::history(&config, command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

//! Steward maintenance CLI.
//!
//! Inspects and maintains the on-disk inbox shared by Steward processes:
//! prints the resolved configuration, forces a sweep, and reads records by key.
//! Logs go to `~/.steward/logs/steward.log` (filtered by `RUST_LOG`), or to
//! stderr when no log file can be opened.

mod command;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use steward_config::{ResolvedConfig, config_path};
use steward_core::Steward;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::command::{Command, USAGE};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: next to the config file, ~/.steward/logs/steward.log
    if let Some(config_path) = config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("steward.log"));
    }

    candidates.push(PathBuf::from(".steward").join("logs").join("steward.log"));
    candidates
}

fn main() -> Result<ExitCode> {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("steward: {err}\n\n{USAGE}");
            return Ok(ExitCode::from(2));
        }
    };

    match command {
        Command::Help => {
            println!("{USAGE}");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Version => {
            println!("steward {}", env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    init_tracing();
    let config = ResolvedConfig::load().context("loading steward configuration")?;
    tracing::info!(command = ?command, inbox = %config.inbox.root.display(), "Starting");

    match command {
        Command::Config => {
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Sweep => {
            let steward = Steward::new(config);
            let acks = steward.acks().sweep_now();
            let screenshots = steward.screenshots().sweep_now();
            tracing::info!(?acks, ?screenshots, "Sweep finished");
            let report = serde_json::json!({ "acks": acks, "screenshots": screenshots });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Ack { session, seq } => {
            let steward = Steward::new(config);
            print_found(steward.acks().get(&session, seq).as_ref())
        }
        Command::Take { session, request } => {
            let steward = Steward::new(config);
            let taken = steward.screenshots().take(&session, &request);
            steward.screenshots().engine().flush();
            print_found(taken.as_ref())
        }
        Command::Help | Command::Version => Ok(ExitCode::SUCCESS),
    }
}

fn print_found<T: serde::Serialize>(record: Option<&T>) -> Result<ExitCode> {
    match record {
        Some(record) => {
            println!(
                "{}",
                serde_json::to_string_pretty(record).context("encoding record")?
            );
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("steward: no such record");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_config(config: &ResolvedConfig) {
    let guards = &config.guards;
    println!(
        "config file          {}",
        config_path().map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
    );
    println!("dedupe ttl           {} ms", config.dedupe_ttl.as_millis());
    println!("rate limit           {} / minute", guards.rate_limit_per_minute);
    println!("concurrent streams   {}", guards.max_concurrent_streams);
    println!(
        "budget               {} per {} ms",
        guards.budget_ceiling,
        guards.budget_window.as_millis()
    );
    println!("inbox root           {}", config.inbox.root.display());
    println!(
        "inbox retention      {} ms",
        config.inbox.retention().as_millis()
    );
    println!(
        "inbox sweep interval {} ms",
        config.inbox.sweep_interval.as_millis()
    );
}

mod cli;
mod present;

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use shelfrank_core::{
    catalog::{self, Catalog},
    config::{self, AppConfig},
};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging()?;

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            config::ensure_default_config()?;
            AppConfig::load()?
        }
    };
    tracing::debug!(?config, "configuration loaded");

    let catalog = Catalog::from_config(&config, !args.no_cache)?;
    let today = Local::now().date_naive();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Ratings {
            output,
            user,
            scorer,
            sort,
        } => {
            let ranking = catalog
                .rated_collection(&user, scorer, &sort, today)
                .with_context(|| format!("could not rank the collection of {user}"))?;
            report_dropped(ranking.dropped);
            present::write_ratings(&mut out, &ranking.top(output.limit()), output.detailed)?;
        }
        Command::Played {
            output,
            user,
            months,
        } => {
            let since = catalog::window_start(today, months);
            let ranking = catalog
                .played_tallies(&user, since)
                .with_context(|| format!("could not rank the plays of {user}"))?;
            report_dropped(ranking.dropped);
            present::write_played(&mut out, &ranking.top(output.limit()), output.detailed)?;
        }
        Command::Hot { output } => {
            let ranking = catalog.hot_games().context("could not load the hot list")?;
            report_dropped(ranking.dropped);
            present::write_hot(&mut out, &ranking.top(output.limit()), output.detailed)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn report_dropped(dropped: usize) {
    if dropped > 0 {
        eprintln!("note: {dropped} invalid records were left out of the ranking");
    }
}

fn init_logging() -> Result<()> {
    let log_dir = config::cache_root();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("shelfrank.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

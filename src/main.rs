mod api;
mod app;
mod cli;
mod config;
mod db;
mod format;
mod http;
mod outline;
mod paths;
mod render;

use std::fs::OpenOptions;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use crate::paths::log_file_path;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let interactive = cli.command.as_ref().is_none_or(cli::Command::is_interactive);
    init_logging(cli.global.verbose, interactive)?;
    app::run(cli)
}

/// Logs to stderr, or to the log file while the full-screen reader owns the
/// terminal.
fn init_logging(verbose: u8, interactive: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        _ => {
            builder.filter_level(LevelFilter::Debug);
        }
    }

    if interactive {
        let path = log_file_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create log directory {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("failed to initialize logging")
}

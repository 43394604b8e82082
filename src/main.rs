use std::fs;

use clap::Parser;
use tracing::info;

mod app;
mod cli;
mod constants;
mod domain;
mod interpreter;
mod storage;

use cli::Cli;

fn setup_logging(verbose: bool) -> Result<(), std::io::Error> {
    // The terminal belongs to the UI, so logs go to a file.
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let log_file = fs::File::create(storage::get_log_path())?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!(verbose, "logging initialized");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let config_path = cli::config_path(&cli);

    if let Some(action) = cli.action {
        cli::run_action(action, &config_path);
        return;
    }

    let tracker = match cli::open_tracker(&config_path) {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app::run_ui(tracker, config_path) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! BTC Map community notifier CLI
//!
//! Intended to be run periodically (e.g. from cron), one instance at a time
//! per checkpoint file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use notifier::{
    error::Result,
    models::Config,
    pipeline::{RunCoordinator, RunReport},
    services::{BtcMapClient, CommandPublisher},
    storage::LocalCheckpointStore,
};

/// Announce new Bitcoin-accepting businesses in a BTC Map community
#[derive(Parser, Debug)]
#[command(name = "btcmap-notifier", version, about)]
struct Cli {
    /// Community (area) slug, e.g. `testville`
    community: String,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "notifier.toml")]
    config: PathBuf,

    /// Checkpoint file (overrides `paths.checkpoint_file`)
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Compose and print announcements without publishing or committing
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Exit code for aborted runs (unknown community, missing boundary, ...).
const EXIT_ABORTED: u8 = 1;
/// Exit code for incomplete runs when `delivery.fail_on_partial` is set.
const EXIT_INCOMPLETE: u8 = 2;

/// Map a run result to the process exit status.
fn exit_code(outcome: &Result<RunReport>, fail_on_partial: bool) -> u8 {
    match outcome {
        Ok(report) if report.needs_rerun() && fail_on_partial => EXIT_INCOMPLETE,
        Ok(_) => 0,
        Err(_) => EXIT_ABORTED,
    }
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: Option<&str>) {
    let level = if verbose {
        "debug"
    } else {
        level.unwrap_or("info")
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    init_logging(
        cli.verbose,
        loaded.as_ref().ok().map(|c| c.logging.level.as_str()),
    );
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    if let Some(path) = cli.checkpoint {
        config.paths.checkpoint_file = path.display().to_string();
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return ExitCode::from(EXIT_ABORTED);
    }

    let provider = match BtcMapClient::from_config(&config.api) {
        Ok(provider) => provider,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(EXIT_ABORTED);
        }
    };
    let publisher = match CommandPublisher::from_config(&config.publisher) {
        Ok(publisher) => publisher,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(EXIT_ABORTED);
        }
    };
    let store = LocalCheckpointStore::new(&config.paths.checkpoint_file);

    log::info!(
        "Checking {} (checkpoint: {})",
        cli.community,
        store.path().display()
    );

    let coordinator = RunCoordinator::new(
        &config,
        Arc::new(provider),
        Arc::new(publisher),
        Arc::new(store),
    )
    .with_dry_run(cli.dry_run);

    // Aborts are already logged by the coordinator.
    let outcome = coordinator.run(&cli.community).await;
    if let Ok(report) = &outcome {
        if report.needs_rerun() {
            log::warn!(
                "Run incomplete; events since {} will be processed again next run",
                report.window_start
            );
        }
    }

    ExitCode::from(exit_code(&outcome, config.delivery.fail_on_partial))
}

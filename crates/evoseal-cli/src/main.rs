// crates/evoseal-cli/src/main.rs
// ============================================================================
// Module: EVOSEAL CLI Entry Point
// Description: Command dispatcher for bringing up the dashboard server over
//              a persisted experiment/version store.
// Purpose: Minimal process entry point; continuous evolution and workflow
//          orchestration wiring (which require caller-supplied adapters,
//          trainers, and health probes) are integration concerns left to
//          the embedding application.
// Dependencies: clap, evoseal-config, evoseal-dashboard, evoseal-store, tokio
// ============================================================================

//! ## Overview
//! `evoseal serve` loads [`evoseal_config::AppConfig`], opens the
//! persisted store it names, and serves the read-only dashboard over it
//! until interrupted. It does not start the continuous evolution service or
//! workflow orchestrator itself — those need concrete
//! [`evoseal_adapters::ComponentAdapter`], [`evoseal_service::ModelTrainer`],
//! and [`evoseal_service::HealthProbe`] implementations that only the
//! embedding application can supply, per the non-goal of this codebase
//! implementing any specific evolutionary algorithm, training loop, or
//! model.

mod source;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use evoseal_config::AppConfig;
use evoseal_store::EvoStore;
use tokio::sync::watch;

use crate::source::StoreDashboardSource;

/// Emits `message` to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "evoseal", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the read-only dashboard server over a persisted store.
    Serve(ServeCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to `evoseal.toml` or
    /// `EVOSEAL_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Process entry point: parses arguments and dispatches to the selected
/// subcommand on a fresh multi-thread Tokio runtime.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => return emit_error(&format!("failed to start async runtime: {err}")),
    };
    match cli.command {
        Commands::Serve(command) => runtime.block_on(serve(command)),
    }
}

/// Runs the `serve` subcommand: loads configuration, opens the store, and
/// serves the dashboard until `Ctrl+C` is received.
async fn serve(command: ServeCommand) -> ExitCode {
    let config = match AppConfig::load(command.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return emit_error(&format!("configuration error: {err}")),
    };

    let store = match EvoStore::open(&config.store.sqlite_path) {
        Ok(store) => Arc::new(store),
        Err(err) => return emit_error(&format!("failed to open store: {err}")),
    };

    let source = Arc::new(StoreDashboardSource::new(store));
    let bind = format!("{}:{}", config.dashboard.host, config.dashboard.port);
    let update_interval = std::time::Duration::from_secs(config.dashboard.update_interval_secs);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let shutdown = tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = cancel_tx.send(true);
    });

    let result = evoseal_dashboard::run(&bind, update_interval, source, cancel_rx).await;
    shutdown.abort();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&format!("dashboard server failed: {err}")),
    }
}

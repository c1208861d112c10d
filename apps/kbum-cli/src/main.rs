//! Kbum CLI - headless terminal player for the Rádio Kbum 102.7 FM live stream.
//!
//! Drives a playback session over the in-process simulated engine. Commands
//! are read line by line from standard input; every session snapshot change
//! is printed as a JSON line.

mod command;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use kbum_core::events::LoggingEventEmitter;
use kbum_core::{bootstrap_session, BootstrappedSession, MediaEngine, SimulatedEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use crate::command::{Command, HELP};
use crate::config::CliConfig;

/// Kbum - Headless live radio player.
#[derive(Parser, Debug)]
#[command(name = "kbum")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "KBUM_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Maximum play retries (overrides config file).
    #[arg(short = 'r', long)]
    max_retries: Option<u32>,

    /// Delay between simulated connection steps in ms (overrides config file).
    #[arg(long)]
    step_delay_ms: Option<u64>,

    /// Start playing immediately.
    #[arg(long)]
    autoplay: bool,

    /// Log every session and health event at debug level.
    #[arg(long)]
    log_events: bool,
}

/// Default pause between simulated engine steps.
const DEFAULT_STEP_DELAY_MS: u64 = 400;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Kbum CLI v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(retries) = args.max_retries {
        config.session.max_retries = retries;
    }
    if let Some(delay) = args.step_delay_ms {
        config.step_delay_ms = Some(delay);
    }

    let step_delay = Duration::from_millis(config.step_delay_ms.unwrap_or(DEFAULT_STEP_DELAY_MS));
    log::info!(
        "Configuration: stream={}, max_retries={}, step_delay={}ms",
        config.station.stream_url,
        config.session.max_retries,
        step_delay.as_millis()
    );

    let engine = Arc::new(SimulatedEngine::with_step_delay(step_delay));
    let services = bootstrap_session(
        &config.session,
        config.station,
        engine as Arc<dyn MediaEngine>,
    )
    .context("Failed to bootstrap session")?;

    if args.log_events {
        services
            .event_bridge
            .set_external_emitter(Arc::new(LoggingEventEmitter));
    }

    // Print every snapshot change as one JSON line
    let mut snapshots = services.session.subscribe().into_stream();
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.next().await {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => log::warn!("Failed to encode snapshot: {}", e),
            }
        }
    });

    if args.autoplay {
        spawn_command(&services, Command::Play);
    }

    eprintln!("{}", HELP);

    tokio::select! {
        result = read_commands(&services) => result?,
        _ = shutdown_signal() => log::info!("Shutdown signal received, cleaning up..."),
    }

    services.shutdown().await;
    printer.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Reads commands from stdin until `quit` or end of input.
async fn read_commands(services: &BootstrappedSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => eprintln!("{}", HELP),
            Ok(Command::Status) => {
                let state = services.session.state();
                eprintln!(
                    "{} | retries {}/{} | reconnects {}/{} | monitor {}",
                    serde_json::to_string(&state.snapshot())?,
                    state.retry_count,
                    state.max_retries,
                    state.reconnect_count,
                    state.max_reconnects,
                    if services.health_monitor.is_running() {
                        "running"
                    } else {
                        "idle"
                    }
                );
            }
            Ok(command) => spawn_command(services, command),
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

/// Runs a session command on its own task so a retrying play never blocks input.
fn spawn_command(services: &BootstrappedSession, command: Command) {
    let session = Arc::clone(&services.session);
    tokio::spawn(async move {
        let result = match command {
            Command::Play => session.play().await,
            Command::Pause => session.pause().await,
            Command::Stop => session.stop().await,
            Command::Toggle => session.toggle_playback().await,
            Command::Volume(level) => session.set_volume(level).await,
            Command::Mute => session.toggle_mute().await,
            Command::Reconnect => session.reconnect().await,
            Command::Status | Command::Help | Command::Quit => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("{:?} failed: {}", command, e);
        }
    });
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

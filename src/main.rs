//! # FrSky Telemetry
//!
//! Streams flight state to a FrSky receiver over FrSky Hub or SmartPort.
//!
//! The flight controller publishes its state as a JSON document; this
//! application reloads it periodically and serves it on the telemetry port.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use frsky_telemetry::config::{Config, LoggingConfig};
use frsky_telemetry::serial::TelemetrySerial;
use frsky_telemetry::state::FlightSnapshot;
use frsky_telemetry::telemetry::build_encoder;
use frsky_telemetry::telemetry::link::TelemetryLink;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the telemetry application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging to stdout and optionally a daily log file
///    - Open the telemetry serial port at the protocol's baud rate
///
/// 2. **Main Loop**
///    - Reload the flight state file in a background task
///    - Tick the encoder and answer receiver polls
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or the serial port cannot
/// be opened.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("FrSky telemetry v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Protocol: {}", config.telemetry.protocol);

    let serial = TelemetrySerial::open(&config.serial.port, config.effective_baud_rate())?;

    let (snapshot_tx, snapshot_rx) = watch::channel(FlightSnapshot::default());
    let feed = tokio::spawn(feed_snapshots(
        PathBuf::from(&config.telemetry.snapshot_path),
        Duration::from_millis(config.telemetry.snapshot_reload_ms),
        snapshot_tx,
    ));

    let encoder = build_encoder(&config, Duration::ZERO);
    let link = TelemetryLink::new(serial.into_port(), encoder, snapshot_rx);

    info!("Press Ctrl+C to exit");

    let stats = link
        .run(Duration::from_millis(config.telemetry.tick_interval_ms), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await;

    feed.abort();
    info!("Total bytes sent: {}", stats.bytes_sent);

    Ok(())
}

/// Set up stdout logging plus an optional daily rolling file.
///
/// `RUST_LOG` overrides the configured level. The returned guard must live
/// until exit so buffered file output is written.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "frsky-telemetry.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Reload the flight state file every `period` and publish changes.
///
/// Read errors are logged once until the file becomes readable again; the
/// last good snapshot stays published meanwhile.
async fn feed_snapshots(path: PathBuf, period: Duration, tx: watch::Sender<FlightSnapshot>) {
    let mut ticker = interval(period);
    let mut last_error: Option<String> = None;

    while !tx.is_closed() {
        ticker.tick().await;

        match FlightSnapshot::load(&path).await {
            Ok(snapshot) => {
                if last_error.take().is_some() {
                    info!("Flight state feed from {} recovered", path.display());
                }
                tx.send_if_modified(|current| {
                    if *current == snapshot {
                        return false;
                    }
                    *current = snapshot;
                    true
                });
            }
            Err(e) => {
                let msg = e.to_string();
                if last_error.as_deref() != Some(msg.as_str()) {
                    warn!("Cannot read flight state from {}: {}", path.display(), msg);
                }
                last_error = Some(msg);
            }
        }
    }
}

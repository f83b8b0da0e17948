//! # Error Types
//!
//! Custom error types for the telemetry host layer using `thiserror`.
//!
//! The encoders themselves never fail: missing data is skipped. Errors only
//! come from configuration, the serial transport, the snapshot feed and the
//! frame decoder.

use thiserror::Error;

/// Main error type for FrSky telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Wire protocol errors (bad sentinel, checksum mismatch, truncated frame)
    #[error("FrSky protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Flight state snapshot could not be parsed
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// The configured serial device could not be opened
    #[error("Serial port not found: {0}")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for FrSky telemetry
pub type Result<T> = std::result::Result<T, TelemetryError>;

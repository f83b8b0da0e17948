//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{Result, TelemetryError};
use crate::frsky::protocol::{sensor_id, SPORT_ESCAPE, SPORT_START_STOP};
use crate::telemetry::Protocol;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub smartport: SmartPortConfig,
    #[serde(default)]
    pub legacy: LegacyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// Overrides the protocol's usual baud rate
    #[serde(default)]
    pub baud_rate: Option<u32>,
}

/// Telemetry link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,

    /// Period of the encoder tick (Hub frame rate, SmartPort watchdog)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// JSON flight state published by the flight controller
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default = "default_snapshot_reload_ms")]
    pub snapshot_reload_ms: u64,
}

/// Optional FrSky Hub items
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HubConfig {
    /// Remaining battery percentage in the slow frame
    pub send_fuel: bool,
    /// IMU temperature as TEMP2 in the slow frame
    pub send_imu_temperature: bool,
    /// Magnetometer heading in the GPS frame
    pub send_compass: bool,
    /// Accelerations in milli-g in the fast frame
    pub send_accelerations: bool,
}

/// SmartPort sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SmartPortConfig {
    #[serde(default = "default_sensor_id")]
    pub sensor_id: u8,

    #[serde(default = "default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,
}

/// Legacy bridge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LegacyConfig {
    #[serde(default = "default_legacy_sensor_ids")]
    pub sensor_ids: Vec<u8>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily rolling log files here
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }

fn default_protocol() -> Protocol { Protocol::SmartPort }
fn default_tick_interval_ms() -> u64 { 200 }
fn default_snapshot_path() -> String { "config/flight_state.json".to_string() }
fn default_snapshot_reload_ms() -> u64 { 100 }

fn default_sensor_id() -> u8 { sensor_id::ID1 }
fn default_inactivity_timeout_ms() -> u64 { 7000 }

fn default_legacy_sensor_ids() -> Vec<u8> {
    vec![sensor_id::ID1, sensor_id::ID2, sensor_id::ID3, sensor_id::ID4]
}

fn default_log_level() -> String { "info".to_string() }

impl Default for SmartPortConfig {
    fn default() -> Self {
        Self {
            sensor_id: default_sensor_id(),
            inactivity_timeout_ms: default_inactivity_timeout_ms(),
        }
    }
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self { sensor_ids: default_legacy_sensor_ids() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Baud rates the receivers understand
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9_600, 19_200, 38_400, 57_600, 115_200];

fn invalid(msg: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Config(toml::de::Error::custom(msg))
}

fn is_reserved_id(id: u8) -> bool {
    id == SPORT_START_STOP || id == SPORT_ESCAPE
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use frsky_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Baud rate to open the port with: the override, or the protocol's own.
    pub fn effective_baud_rate(&self) -> u32 {
        self.serial
            .baud_rate
            .unwrap_or_else(|| self.telemetry.protocol.default_baud_rate())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if let Some(baud) = self.serial.baud_rate {
            if !SUPPORTED_BAUD_RATES.contains(&baud) {
                return Err(invalid(format!(
                    "baud_rate must be one of: {:?}",
                    SUPPORTED_BAUD_RATES
                )));
            }
        }

        // Validate timing fields
        if self.telemetry.tick_interval_ms == 0 || self.telemetry.tick_interval_ms > 10000 {
            return Err(invalid("tick_interval_ms must be between 1 and 10000"));
        }

        if self.telemetry.snapshot_reload_ms == 0 || self.telemetry.snapshot_reload_ms > 60000 {
            return Err(invalid("snapshot_reload_ms must be between 1 and 60000"));
        }

        if self.telemetry.snapshot_path.is_empty() {
            return Err(invalid("snapshot_path cannot be empty"));
        }

        if self.smartport.inactivity_timeout_ms < 100 || self.smartport.inactivity_timeout_ms > 60000 {
            return Err(invalid("inactivity_timeout_ms must be between 100 and 60000"));
        }

        // Sensor ids must not collide with framing bytes
        if is_reserved_id(self.smartport.sensor_id) {
            return Err(invalid(format!(
                "smartport sensor_id 0x{:02X} is a reserved framing byte",
                self.smartport.sensor_id
            )));
        }

        if self.legacy.sensor_ids.is_empty() {
            return Err(invalid("legacy sensor_ids cannot be empty"));
        }

        if let Some(&id) = self.legacy.sensor_ids.iter().find(|&&id| is_reserved_id(id)) {
            return Err(invalid(format!(
                "legacy sensor id 0x{:02X} is a reserved framing byte",
                id
            )));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

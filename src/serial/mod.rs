//! # Serial Communication Module
//!
//! Opens the half-duplex telemetry line to the receiver.
//!
//! This module handles:
//! - Opening the configured port at the protocol's baud rate (8N1)
//! - Handing the stream to the link as a [`SerialPortIO`]
//!
//! Single-wire inversion is left to the hardware (an inverter or a UART
//! that supports it); the port is opened as a plain 8N1 line.

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

use crate::error::{Result, TelemetryError};
use std::path::Path;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Telemetry serial port handle
pub struct TelemetrySerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
    baud_rate: u32,
}

impl std::fmt::Debug for TelemetrySerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySerial")
            .field("device_path", &self.device_path)
            .field("baud_rate", &self.baud_rate)
            .finish_non_exhaustive()
    }
}

impl TelemetrySerial {
    /// Open the telemetry port
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - 9600 for Hub, 57600 for SmartPort
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the device does not exist and
    /// `Serial` if it exists but cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use frsky_telemetry::serial::TelemetrySerial;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let serial = TelemetrySerial::open("/dev/ttyUSB0", 57_600)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(TelemetryError::SerialPortNotFound(path.to_string()));
        }

        debug!("Opening serial port {} at {} baud", path, baud_rate);

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TelemetryError::Serial(format!("Failed to open {}: {}", path, e)))?;

        info!("Opened telemetry port {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            device_path: path.to_string(),
            baud_rate,
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Consume the handle into an async port for the link.
    pub fn into_port(self) -> TokioSerialPort {
        TokioSerialPort::new(self.port)
    }
}

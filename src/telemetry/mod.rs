//! # Telemetry Module
//!
//! Protocol encoders that turn flight state into downlink bytes.
//!
//! This module handles:
//! - One [`TelemetryEncoder`] interface shared by all protocols
//! - FrSky Hub time-division frames ([`hub`])
//! - SmartPort poll tracking and table rotation ([`poll`], [`smartport`])
//! - The legacy SmartPort/MAVLink bridge round robin ([`legacy`])
//! - The async link driving an encoder over a serial port ([`link`])
//!
//! The protocol is picked once from configuration; each encoder owns all
//! of its counters so it can be tested on its own.

pub mod hub;
pub mod poll;
pub mod smartport;
pub mod legacy;
pub mod link;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::frsky::framer::ByteSink;
use crate::state::FlightSnapshot;

/// Downlink protocol spoken on the telemetry port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// FrSky D-series hub, one-way
    Hub,
    /// FrSky SmartPort, answers receiver polls
    SmartPort,
    /// SmartPort as spoken by the MAVLink bridge firmware
    Legacy,
}

impl Protocol {
    /// Baud rate the receiver expects for this protocol.
    pub fn default_baud_rate(self) -> u32 {
        match self {
            Protocol::Hub => 9_600,
            Protocol::SmartPort | Protocol::Legacy => 57_600,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Hub => "FrSky Hub",
            Protocol::SmartPort => "SmartPort",
            Protocol::Legacy => "SmartPort (legacy bridge)",
        };
        f.write_str(name)
    }
}

/// A telemetry protocol encoder.
///
/// Implementations are driven from a single task: `on_tick` on the
/// telemetry period and `on_byte_received` for every inbound byte. Neither
/// blocks; output goes to a non-blocking [`ByteSink`].
pub trait TelemetryEncoder: Send {
    /// Protocol this encoder speaks.
    fn protocol(&self) -> Protocol;

    /// Periodic service: emit due frames or answer a pending poll.
    fn on_tick(&mut self, snapshot: &FlightSnapshot, now: Duration, out: &mut dyn ByteSink);

    /// Observe one received byte.
    ///
    /// `rx_pending` is true when more received bytes are already waiting.
    fn on_byte_received(
        &mut self,
        byte: u8,
        rx_pending: bool,
        snapshot: &FlightSnapshot,
        now: Duration,
        out: &mut dyn ByteSink,
    );

    /// A poll is waiting for an answer from `on_tick`.
    fn has_pending_request(&self) -> bool {
        false
    }

    /// The receiver stopped polling for longer than the inactivity window.
    fn is_timed_out(&self) -> bool {
        false
    }

    /// Reset link state as if the port had just been configured.
    fn reconfigure(&mut self, _now: Duration) {}
}

/// Build the encoder selected in the configuration.
pub fn build_encoder(config: &Config, now: Duration) -> Box<dyn TelemetryEncoder> {
    match config.telemetry.protocol {
        Protocol::Hub => Box::new(hub::HubEncoder::new(config.hub.clone())),
        Protocol::SmartPort => {
            let mut encoder = smartport::SmartPortEncoder::new(&config.smartport);
            encoder.reconfigure(now);
            Box::new(encoder)
        }
        Protocol::Legacy => Box::new(legacy::LegacyEncoder::new(&config.legacy)),
    }
}

//! # Legacy SmartPort Encoder
//!
//! SmartPort as spoken by the MAVLink-to-SmartPort bridge firmware. The
//! sensor answers polls for any of several physical ids, straight from the
//! receive path, and walks a fixed round robin of 20 slots regardless of
//! which id was polled.
//!
//! Differences from [`super::smartport`]:
//! - Replies are sent as soon as the poll byte arrives
//! - No inactivity watchdog
//! - Checksum uses the double carry fold
//! - Cells are sent two per item

use std::time::Duration;

use tracing::trace;

use super::{Protocol, TelemetryEncoder};
use crate::config::LegacyConfig;
use crate::frsky::crc::CarryFold;
use crate::frsky::encoding::*;
use crate::frsky::framer::{ByteSink, Framer};
use crate::frsky::protocol::{sport_id, SportValue, SPORT_START_STOP};
use crate::state::{degrees, FlightSnapshot};

/// Slots in one round robin.
pub const LEGACY_SLOT_COUNT: u8 = 20;

/// GPS fix type required for position items.
pub const FIX_3D: u8 = 3;

/// Legacy bridge telemetry encoder.
#[derive(Debug, Clone)]
pub struct LegacyEncoder {
    sensor_ids: Vec<u8>,
    last_byte: Option<u8>,
    slot: u8,
}

impl LegacyEncoder {
    pub fn new(config: &LegacyConfig) -> Self {
        Self {
            sensor_ids: config.sensor_ids.clone(),
            last_byte: None,
            slot: 0,
        }
    }

    /// Slot the next poll will be answered from.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Answer one poll from the current slot and advance the round robin.
    ///
    /// Empty slots and slots without data send nothing but still advance.
    pub fn respond(&mut self, snapshot: &FlightSnapshot, out: &mut dyn ByteSink) -> Option<SportValue> {
        let slot = self.slot;
        self.slot = (slot + 1) % LEGACY_SLOT_COUNT;

        let item = encode_slot(slot, snapshot)?;
        Framer::sport(out, CarryFold::Double).sport_packet(item);
        trace!("Legacy slot {} reply 0x{:04X} = {}", slot, item.id, item.value);
        Some(item)
    }
}

/// Item for one round-robin slot, `None` when empty or without data.
pub fn encode_slot(slot: u8, snapshot: &FlightSnapshot) -> Option<SportValue> {
    let gps = &snapshot.gps;
    let battery = &snapshot.battery;
    let fix_3d = gps.fix == FIX_3D;

    let (id, value) = match slot {
        0 if fix_3d => (sport_id::SPEED, (gps.ground_speed_mps * 20.0).max(0.0) as u32),
        1 => (sport_id::RPM, wire_i32(snapshot.throttle * 200.0)),
        2 => (sport_id::CURRENT, wire_i32(battery.current_a * 100.0)),
        3 => (sport_id::ALTITUDE, wire_i32(snapshot.baro.relative_altitude_m() * 100.0)),
        4 if fix_3d => (sport_id::LATLONG, legacy_latlong(gps.longitude_raw, true)),
        5 if fix_3d => (sport_id::LATLONG, legacy_latlong(gps.latitude_raw, false)),
        6 => (sport_id::HEADING, wire_i32(degrees(snapshot.compass_heading_rad) * 100.0)),
        8 => (sport_id::CELLS, legacy_cell_pair(battery, 0)?),
        9 => (sport_id::CELLS, legacy_cell_pair(battery, 2)?),
        10 => (sport_id::CELLS, legacy_cell_pair(battery, 4)?),
        11 => (sport_id::ACCX, wire_i32(snapshot.acceleration.x * 100.0)),
        12 => (sport_id::ACCY, wire_i32(snapshot.acceleration.y * 100.0)),
        13 => (sport_id::ACCZ, wire_i32(snapshot.acceleration.z * 100.0)),
        14 => (sport_id::VFAS, wire_i32(battery.volts * 100.0)),
        17 => (sport_id::VARIO, wire_i32(snapshot.baro.climb_rate_mps * 100.0)),
        18 => (sport_id::GPS_ALT, wire_i32(gps.altitude_m * 100.0)),
        _ => return None,
    };

    Some(SportValue::new(id, value))
}

impl TelemetryEncoder for LegacyEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Legacy
    }

    fn on_tick(&mut self, _snapshot: &FlightSnapshot, _now: Duration, _out: &mut dyn ByteSink) {
        // Replies go out from the receive path
    }

    fn on_byte_received(
        &mut self,
        byte: u8,
        _rx_pending: bool,
        snapshot: &FlightSnapshot,
        _now: Duration,
        out: &mut dyn ByteSink,
    ) {
        let previous = self.last_byte.replace(byte);

        if previous == Some(SPORT_START_STOP) && self.sensor_ids.contains(&byte) {
            self.respond(snapshot, out);
        }
    }

    fn reconfigure(&mut self, _now: Duration) {
        self.last_byte = None;
    }
}

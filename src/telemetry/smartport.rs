//! # SmartPort Encoder
//!
//! Answers receiver polls with one data item per poll, rotating through a
//! fixed table of data ids. Items whose source is unavailable are skipped
//! within the same poll so every accepted poll gets a useful answer when
//! one exists.
//!
//! ## Units on the wire
//!
//! | Id | Value |
//! |----|-------|
//! | SPEED | 0.1 km/h |
//! | VFAS, A4 | 0.01 V |
//! | CURRENT | 0.1 A |
//! | ALTITUDE, GPS_ALT | cm |
//! | VARIO | cm/s |
//! | FUEL | mAh used |
//! | HEADING | 0.01 deg |
//! | ACCX/Y/Z | 0.01 g |
//! | T1 | status digits |
//! | T2 | GPS status digits |

use std::time::Duration;

use tracing::trace;

use super::poll::{PollState, PollTracker};
use super::{Protocol, TelemetryEncoder};
use crate::config::SmartPortConfig;
use crate::frsky::crc::CarryFold;
use crate::frsky::encoding::*;
use crate::frsky::framer::{ByteSink, Framer};
use crate::frsky::protocol::{sport_id, SportValue};
use crate::state::{degrees, FlightSnapshot};

/// Rotation order of data ids. Lat/long appears twice: the first visit
/// sends latitude, the second longitude.
pub const DATA_ID_TABLE: [u16; 17] = [
    sport_id::SPEED,
    sport_id::VFAS,
    sport_id::CURRENT,
    sport_id::ALTITUDE,
    sport_id::FUEL,
    sport_id::LATLONG,
    sport_id::LATLONG,
    sport_id::VARIO,
    sport_id::CELLS,
    sport_id::HEADING,
    sport_id::ACCX,
    sport_id::ACCY,
    sport_id::ACCZ,
    sport_id::T1,
    sport_id::T2,
    sport_id::GPS_ALT,
    sport_id::A4,
];

/// SmartPort telemetry encoder.
#[derive(Debug, Clone)]
pub struct SmartPortEncoder {
    tracker: PollTracker,
    id_index: usize,
    cells: CellRotation,
}

impl SmartPortEncoder {
    pub fn new(config: &SmartPortConfig) -> Self {
        Self {
            tracker: PollTracker::new(
                config.sensor_id,
                Duration::from_millis(config.inactivity_timeout_ms),
            ),
            id_index: 0,
            cells: CellRotation::new(),
        }
    }

    pub fn poll_state(&self) -> PollState {
        self.tracker.state()
    }

    /// Answer the pending poll, if any.
    ///
    /// Walks the id table at most once. Returns the item sent, or `None`
    /// when nothing was pending or no item had data.
    pub fn service(&mut self, snapshot: &FlightSnapshot, out: &mut dyn ByteSink) -> Option<SportValue> {
        if !self.tracker.take_request() {
            return None;
        }

        for _ in 0..DATA_ID_TABLE.len() {
            let index = self.id_index;
            self.id_index = (index + 1) % DATA_ID_TABLE.len();

            let id = DATA_ID_TABLE[index];
            if let Some(value) = self.encode(id, index, snapshot) {
                let item = SportValue::new(id, value);
                Framer::sport(out, CarryFold::Single).sport_packet(item);
                trace!("SmartPort reply 0x{:04X} = {}", id, value);
                return Some(item);
            }
        }

        trace!("SmartPort poll with no data available");
        None
    }

    /// Encode one table slot, `None` when its source is unavailable.
    fn encode(&mut self, id: u16, index: usize, snapshot: &FlightSnapshot) -> Option<u32> {
        let gps = &snapshot.gps;
        let baro = &snapshot.baro;
        let battery = &snapshot.battery;
        let gps_ok = gps.present && gps.valid;

        match id {
            sport_id::SPEED if gps_ok => {
                let cm_per_s = (gps.ground_speed_mps * 100.0).max(0.0) as u32;
                Some((cm_per_s * 36 + 18) / 100)
            }
            sport_id::VFAS => Some(wire_i32(battery.volts * 100.0)),
            sport_id::CURRENT => Some(wire_i32(battery.current_a * 10.0)),
            sport_id::ALTITUDE if baro.active => Some(wire_i32(baro.relative_altitude_m() * 100.0)),
            sport_id::FUEL => Some(wire_i32(battery.charge_used_mah)),
            sport_id::LATLONG if gps_ok => {
                // Second table entry carries longitude
                if is_longitude_slot(index) {
                    Some(sport_latlong(gps.longitude_raw, true))
                } else {
                    Some(sport_latlong(gps.latitude_raw, false))
                }
            }
            sport_id::VARIO if baro.active => Some(wire_i32(baro.climb_rate_mps * 100.0)),
            sport_id::CELLS => self.cells.next_sport(battery),
            sport_id::HEADING => Some(wire_i32(degrees(snapshot.attitude.yaw) * 100.0)),
            sport_id::ACCX => Some(wire_i32(snapshot.acceleration.x * 100.0)),
            sport_id::ACCY => Some(wire_i32(snapshot.acceleration.y * 100.0)),
            sport_id::ACCZ => Some(wire_i32(snapshot.acceleration.z * 100.0)),
            sport_id::T1 => Some(status_digits(snapshot)),
            sport_id::T2 if gps.present => Some(sport_gps_status(gps)),
            sport_id::GPS_ALT if gps_ok => Some(wire_i32(gps.altitude_m * 100.0)),
            sport_id::A4 => battery
                .average_cell_volts()
                .map(|volts| wire_i32(volts * 100.0)),
            _ => None,
        }
    }
}

fn is_longitude_slot(index: usize) -> bool {
    index > 0 && DATA_ID_TABLE[index - 1] == sport_id::LATLONG
}

impl TelemetryEncoder for SmartPortEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::SmartPort
    }

    fn on_tick(&mut self, snapshot: &FlightSnapshot, now: Duration, out: &mut dyn ByteSink) {
        self.tracker.check_timeout(now);
        if self.tracker.is_active() {
            self.service(snapshot, out);
        }
    }

    fn on_byte_received(
        &mut self,
        byte: u8,
        rx_pending: bool,
        _snapshot: &FlightSnapshot,
        now: Duration,
        _out: &mut dyn ByteSink,
    ) {
        self.tracker.on_byte(byte, rx_pending, now);
    }

    fn has_pending_request(&self) -> bool {
        self.tracker.has_request()
    }

    fn is_timed_out(&self) -> bool {
        self.tracker.state() == PollState::TimedOut
    }

    fn reconfigure(&mut self, now: Duration) {
        self.tracker.configure(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frsky::decoder::{decode_sport_packet, decode_sport_stream};
    use crate::frsky::protocol::sensor_id;
    use crate::state::{BaroState, BatteryState, GpsState};

    fn config() -> SmartPortConfig {
        SmartPortConfig {
            sensor_id: sensor_id::ID1,
            inactivity_timeout_ms: 7_000,
        }
    }

    fn full_snapshot() -> FlightSnapshot {
        FlightSnapshot {
            gps: GpsState {
                present: true,
                valid: true,
                origin_valid: true,
                fix: 3,
                satellites: 9,
                latitude_raw: 473_851_230,
                longitude_raw: -85_000_000,
                ground_speed_mps: 10.0,
                altitude_m: 250.0,
                heading_rad: 0.0,
            },
            battery: BatteryState {
                volts: 16.8,
                current_a: 2.5,
                charge_used_mah: 320.0,
                capacity_mah: 0.0,
                cell_count: 4,
            },
            baro: BaroState {
                active: true,
                altitude_m: 112.0,
                origin_altitude_m: 100.0,
                temperature_c: 20.0,
                climb_rate_mps: 1.5,
            },
            ..Default::default()
        }
    }

    fn poll(encoder: &mut SmartPortEncoder, snapshot: &FlightSnapshot, at_ms: u64) -> Vec<u8> {
        let now = Duration::from_millis(at_ms);
        let mut wire: Vec<u8> = Vec::new();
        encoder.on_byte_received(0x7E, false, snapshot, now, &mut wire);
        encoder.on_byte_received(sensor_id::ID1, false, snapshot, now, &mut wire);
        assert!(wire.is_empty());
        encoder.on_tick(snapshot, now, &mut wire);
        wire
    }

    fn configured() -> SmartPortEncoder {
        let mut encoder = SmartPortEncoder::new(&config());
        encoder.reconfigure(Duration::ZERO);
        encoder
    }

    #[test]
    fn test_no_reply_without_poll() {
        let mut encoder = configured();
        let mut wire: Vec<u8> = Vec::new();
        encoder.on_tick(&full_snapshot(), Duration::from_millis(10), &mut wire);
        assert!(wire.is_empty());
    }

    #[test]
    fn test_one_packet_per_poll() {
        let mut encoder = configured();
        let snapshot = full_snapshot();

        let wire = poll(&mut encoder, &snapshot, 10);
        let value = decode_sport_packet(&wire).unwrap();
        assert_eq!(value.id, sport_id::SPEED);
        // 10 m/s = 36.0 km/h
        assert_eq!(value.value, 360);
        assert!(!encoder.has_pending_request());

        // Request consumed: a second tick sends nothing
        let mut wire: Vec<u8> = Vec::new();
        encoder.on_tick(&snapshot, Duration::from_millis(20), &mut wire);
        assert!(wire.is_empty());
    }

    #[test]
    fn test_full_rotation_with_all_sources() {
        let mut encoder = configured();
        let snapshot = full_snapshot();

        let mut wire: Vec<u8> = Vec::new();
        for i in 0..DATA_ID_TABLE.len() as u64 {
            wire.extend(poll(&mut encoder, &snapshot, 10 + i));
        }

        let values = decode_sport_stream(&wire).unwrap();
        let ids: Vec<u16> = values.iter().map(|v| v.id).collect();
        assert_eq!(ids, DATA_ID_TABLE.to_vec());

        let value_at = |i: usize| values[i].value;
        assert_eq!(value_at(1), 1680); // VFAS
        assert_eq!(value_at(2), 25); // CURRENT
        assert_eq!(value_at(3), 1200); // ALTITUDE
        assert_eq!(value_at(4), 320); // FUEL
        assert_eq!(value_at(5), 28_431_073); // latitude, north
        assert_eq!(value_at(6), 5_100_000 | LATLONG_LONGITUDE_BIT | LATLONG_NEGATIVE_BIT);
        assert_eq!(value_at(7), 150); // VARIO
        assert_eq!(value_at(8) >> 8, 2100); // 4.2 V per cell
        assert_eq!(value_at(13), 10_221); // T1
        assert_eq!(value_at(14), 3009); // T2
        assert_eq!(value_at(15), 25_000); // GPS_ALT
        assert_eq!(value_at(16), 420); // A4
    }

    #[test]
    fn test_rotation_wraps() {
        let mut encoder = configured();
        let snapshot = full_snapshot();

        for i in 0..DATA_ID_TABLE.len() as u64 {
            poll(&mut encoder, &snapshot, i);
        }
        let wire = poll(&mut encoder, &snapshot, 100);
        assert_eq!(decode_sport_packet(&wire).unwrap().id, sport_id::SPEED);
    }

    #[test]
    fn test_unavailable_items_skipped_within_poll() {
        let mut encoder = configured();
        let mut snapshot = full_snapshot();
        snapshot.gps.present = false;
        snapshot.gps.valid = false;
        snapshot.baro.active = false;

        let mut ids = Vec::new();
        for i in 0..12 {
            let wire = poll(&mut encoder, &snapshot, i);
            ids.push(decode_sport_packet(&wire).unwrap().id);
        }

        assert_eq!(
            ids,
            vec![
                sport_id::VFAS,
                sport_id::CURRENT,
                sport_id::FUEL,
                sport_id::CELLS,
                sport_id::HEADING,
                sport_id::ACCX,
                sport_id::ACCY,
                sport_id::ACCZ,
                sport_id::T1,
                sport_id::A4,
                sport_id::VFAS,
                sport_id::CURRENT,
            ]
        );
    }

    #[test]
    fn test_pack_voltage_always_answers() {
        let mut encoder = configured();
        let snapshot = FlightSnapshot::default();

        // Pack voltage, current and status need no sensor, so every poll
        // gets a reply even with an empty snapshot
        for i in 0..DATA_ID_TABLE.len() as u64 {
            assert!(!poll(&mut encoder, &snapshot, i).is_empty());
        }
    }

    #[test]
    fn test_t2_needs_gps_present_only() {
        let mut encoder = configured();
        let mut snapshot = full_snapshot();
        snapshot.gps.valid = false;
        snapshot.gps.satellites = 4;

        let mut found = None;
        for i in 0..DATA_ID_TABLE.len() as u64 {
            let value = decode_sport_packet(&poll(&mut encoder, &snapshot, i)).unwrap();
            if value.id == sport_id::T2 {
                found = Some(value.value);
            }
        }
        assert_eq!(found, Some(2004));
    }

    #[test]
    fn test_timeout_stops_replies() {
        let mut encoder = configured();
        let snapshot = full_snapshot();
        poll(&mut encoder, &snapshot, 100);
        assert_eq!(encoder.poll_state(), PollState::Working);

        let mut wire: Vec<u8> = Vec::new();
        encoder.on_tick(&snapshot, Duration::from_millis(7_200), &mut wire);
        assert!(encoder.is_timed_out());

        let wire = poll(&mut encoder, &snapshot, 7_300);
        assert!(wire.is_empty());

        encoder.reconfigure(Duration::from_millis(7_400));
        assert_eq!(encoder.poll_state(), PollState::Initialized);
        assert!(!poll(&mut encoder, &snapshot, 7_500).is_empty());
    }

    #[test]
    fn test_unconfigured_encoder_stays_silent() {
        let mut encoder = SmartPortEncoder::new(&config());
        let wire = poll(&mut encoder, &full_snapshot(), 10);
        assert!(wire.is_empty());
        assert_eq!(encoder.poll_state(), PollState::Uninitialized);
    }

    #[test]
    fn test_negative_values_are_twos_complement() {
        let mut encoder = configured();
        let mut snapshot = full_snapshot();
        snapshot.baro.climb_rate_mps = -2.0;

        let mut vario = None;
        for i in 0..DATA_ID_TABLE.len() as u64 {
            let value = decode_sport_packet(&poll(&mut encoder, &snapshot, i)).unwrap();
            if value.id == sport_id::VARIO {
                vario = Some(value.value as i32);
            }
        }
        assert_eq!(vario, Some(-200));
    }
}

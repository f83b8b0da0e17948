//! # FrSky Hub Encoder
//!
//! Time-division multiplexes flight state over the one-way D-series hub
//! link. Every call sends one frame of packets terminated by a sentinel.
//!
//! ## Frame schedule (40 calls)
//!
//! | Call | Frame | Contents |
//! |------|-------|----------|
//! | 40 | Slow | time, baro temperature (+ optional fuel, IMU temperature) |
//! | 5, 10, ... 35 | Medium | GPS block when valid, GPS status |
//! | others | Fast | baro, vario, volts, cell, current, mAh, gyro, attitude |
//!
//! With a 200 ms tick the fast frame arrives five times a second, the GPS
//! frame once a second and the slow frame every eight seconds.

use std::time::Duration;

use tracing::trace;

use super::{Protocol, TelemetryEncoder};
use crate::config::HubConfig;
use crate::frsky::encoding::*;
use crate::frsky::framer::{ByteSink, Framer};
use crate::frsky::protocol::{hub_id, HubValue};
use crate::state::{degrees, FlightSnapshot};

/// Calls per full schedule; the last one carries the slow frame.
pub const SLOW_FRAME_PERIOD: u8 = 40;

/// Every fifth call carries the GPS frame.
pub const MEDIUM_FRAME_DIVISOR: u8 = 5;

/// "Where" items are only sent below this distance from home.
pub const MAX_WHERE_DISTANCE_M: f32 = 32_000.0;

/// Frame class picked by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubFrame {
    Fast,
    Medium,
    Slow,
}

/// FrSky Hub telemetry encoder.
#[derive(Debug, Clone)]
pub struct HubEncoder {
    frame_count: u8,
    cells: CellRotation,
    options: HubConfig,
}

impl HubEncoder {
    pub fn new(options: HubConfig) -> Self {
        Self {
            frame_count: 0,
            cells: CellRotation::new(),
            options,
        }
    }

    /// Advance the call counter and pick the frame for this call.
    pub fn next_frame(&mut self) -> HubFrame {
        self.frame_count += 1;

        if self.frame_count == SLOW_FRAME_PERIOD {
            self.frame_count = 0;
            HubFrame::Slow
        } else if self.frame_count % MEDIUM_FRAME_DIVISOR == 0 {
            HubFrame::Medium
        } else {
            HubFrame::Fast
        }
    }

    /// Send the next frame and report which one it was.
    pub fn send(&mut self, snapshot: &FlightSnapshot, out: &mut dyn ByteSink) -> HubFrame {
        let frame = self.next_frame();
        let mut framer = Framer::hub(out);

        match frame {
            HubFrame::Slow => self.send_slow(snapshot, &mut framer),
            HubFrame::Medium => self.send_medium(snapshot, &mut framer),
            HubFrame::Fast => self.send_fast(snapshot, &mut framer),
        }
        framer.emit_header();

        trace!("Sent hub {:?} frame", frame);
        frame
    }

    fn send_fast(&mut self, snapshot: &FlightSnapshot, framer: &mut Framer<'_>) {
        let baro = &snapshot.baro;
        let battery = &snapshot.battery;

        if baro.active {
            send_pair(framer, hub_id::BARO_ALT_BP, hub_id::BARO_ALT_AP, baro.relative_altitude_m(), 10);
            send(framer, hub_id::VARIO, baro.climb_rate_mps * 100.0);
        }

        send_pair(framer, hub_id::VOLTS_BP, hub_id::VOLTS_AP, battery.volts * 0.5, 100);
        if let Some(word) = self.cells.next_hub(battery) {
            framer.hub_packet(HubValue::new(hub_id::VOLTS, word));
        }
        send(framer, hub_id::CURRENT, battery.current_a * 10.0);
        send(framer, hub_id::MAH, battery.charge_used_mah);

        if self.options.send_accelerations {
            let acc = &snapshot.acceleration;
            send(framer, hub_id::ACCEL_X, acc.x * 1000.0);
            send(framer, hub_id::ACCEL_Y, acc.y * 1000.0);
            send(framer, hub_id::ACCEL_Z, acc.z * 1000.0);
        }

        let rates = &snapshot.rates;
        send(framer, hub_id::GYRO_X, degrees(rates.pitch));
        send(framer, hub_id::GYRO_Y, degrees(rates.roll));
        send(framer, hub_id::GYRO_Z, degrees(rates.yaw));

        send(framer, hub_id::PITCH, degrees(snapshot.attitude.pitch));
        send(framer, hub_id::ROLL, degrees(snapshot.attitude.roll));
    }

    fn send_medium(&mut self, snapshot: &FlightSnapshot, framer: &mut Framer<'_>) {
        let gps = &snapshot.gps;

        if gps.valid {
            if gps.origin_valid {
                send_where(snapshot, framer);
            }
            send_pair(framer, hub_id::GPS_SPEED_BP, hub_id::GPS_SPEED_AP, gps.ground_speed_mps * 3.6, 10);
            send_pair(framer, hub_id::GPS_ALT_BP, hub_id::GPS_ALT_AP, gps.altitude_m, 10);
            send_pair(framer, hub_id::GPS_COURS_BP, hub_id::GPS_COURS_AP, degrees(gps.heading_rad), 10);
            send_coordinates(snapshot, framer);
        }

        framer.hub_packet(HubValue::new(hub_id::GPS_STAT, hub_gps_status(gps)));

        if self.options.send_compass {
            send(framer, hub_id::COMPASS, degrees(snapshot.compass_heading_rad));
        }
    }

    fn send_slow(&mut self, snapshot: &FlightSnapshot, framer: &mut Framer<'_>) {
        let (hour_min, sec) = hub_time(snapshot.uptime_ms);
        framer.hub_packet(HubValue::new(hub_id::GPS_HOUR_MIN, hour_min));
        framer.hub_packet(HubValue::new(hub_id::GPS_SEC, sec));

        if snapshot.baro.active {
            send(framer, hub_id::TEMP1, snapshot.baro.temperature_c);
        }
        if self.options.send_imu_temperature {
            send(framer, hub_id::TEMP2, snapshot.imu_temperature_c);
        }
        if self.options.send_fuel {
            if let Some(percent) = fuel_percent(&snapshot.battery) {
                framer.hub_packet(HubValue::new(hub_id::FUEL, percent));
            }
        }
    }
}

fn send(framer: &mut Framer<'_>, id: u8, value: f32) {
    framer.hub_packet(HubValue::new(id, value as i16));
}

fn send_pair(framer: &mut Framer<'_>, bp_id: u8, ap_id: u8, value: f32, scale: u16) {
    let pair = fixed_pair(value, scale);
    framer.hub_packet(HubValue::new(bp_id, pair.bp));
    framer.hub_packet(HubValue::new(ap_id, pair.ap as i16));
}

fn send_where(snapshot: &FlightSnapshot, framer: &mut Framer<'_>) {
    let nav = &snapshot.nav;

    if (0.0..MAX_WHERE_DISTANCE_M).contains(&nav.distance_m) {
        send(framer, hub_id::WHERE_DIST, nav.distance_m);
        send(framer, hub_id::WHERE_BEAR, degrees(nav.bearing_rad));
        send(framer, hub_id::WHERE_ELEV, degrees(nav.elevation_rad));
        send(framer, hub_id::WHERE_HINT, degrees(nav.hint_rad));
    }
}

fn send_coordinates(snapshot: &FlightSnapshot, framer: &mut Framer<'_>) {
    let gps = &snapshot.gps;

    let lat = gps_to_ddmm(gps.latitude_raw);
    framer.hub_packet(HubValue::new(hub_id::GPS_LAT_BP, lat.bp as i16));
    framer.hub_packet(HubValue::new(hub_id::GPS_LAT_AP, lat.ap as i16));
    let ns = hemisphere(gps.latitude_raw, b'N', b'S');
    framer.hub_packet(HubValue::new(hub_id::GPS_LAT_NS, i16::from(ns)));

    let lon = gps_to_ddmm(gps.longitude_raw);
    framer.hub_packet(HubValue::new(hub_id::GPS_LONG_BP, lon.bp as i16));
    framer.hub_packet(HubValue::new(hub_id::GPS_LONG_AP, lon.ap as i16));
    let ew = hemisphere(gps.longitude_raw, b'E', b'W');
    framer.hub_packet(HubValue::new(hub_id::GPS_LONG_EW, i16::from(ew)));
}

impl TelemetryEncoder for HubEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Hub
    }

    fn on_tick(&mut self, snapshot: &FlightSnapshot, _now: Duration, out: &mut dyn ByteSink) {
        self.send(snapshot, out);
    }

    fn on_byte_received(
        &mut self,
        _byte: u8,
        _rx_pending: bool,
        _snapshot: &FlightSnapshot,
        _now: Duration,
        _out: &mut dyn ByteSink,
    ) {
        // Hub is downlink only
    }
}

//! # Value Encoding
//!
//! Conversions from flight state readings to the integer fields the
//! FrSky displays expect: fixed-point BP/AP pairs, NMEA style
//! degrees-minutes, multiplexed cell voltages and decimal status digits.
//!
//! Every function here is pure; the only state is the cell rotation index.

use crate::state::{BatteryState, FlightPhase, FlightSnapshot, GpsState, NavState};

/// Value split into before/after decimal point integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPair {
    /// Truncated integer part (keeps the sign)
    pub bp: i16,
    /// Fraction in units of `1/scale`, never negative
    pub ap: u16,
}

/// Fractional digits of `v` at the given scale: `|round(v * s)| mod s`.
///
/// # Examples
///
/// ```
/// use frsky_telemetry::frsky::encoding::make_frac;
///
/// assert_eq!(make_frac(-5.6, 10), 6);
/// ```
pub fn make_frac(v: f32, scale: u16) -> u16 {
    if scale == 0 {
        return 0;
    }
    let scaled = (f64::from(v) * f64::from(scale)).round().abs() as u64;
    (scaled % u64::from(scale)) as u16
}

/// Split `v` into a BP/AP pair with `scale` fractional steps.
///
/// # Examples
///
/// ```
/// use frsky_telemetry::frsky::encoding::fixed_pair;
///
/// let pair = fixed_pair(12.34, 100);
/// assert_eq!((pair.bp, pair.ap), (12, 34));
/// ```
pub fn fixed_pair(v: f32, scale: u16) -> FixedPair {
    FixedPair {
        bp: v.trunc() as i16,
        ap: make_frac(v, scale),
    }
}

/// Coordinate in DDDMM.MMM form, magnitude only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegreesMinutes {
    /// `degrees * 100 + whole minutes`
    pub bp: u16,
    /// Thousandths of a minute
    pub ap: u16,
}

/// Units per degree of a raw GPS coordinate.
pub const GPS_RAW_PER_DEGREE: u32 = 10_000_000;

/// Convert a raw 1e-7 degree coordinate to degrees-minutes.
///
/// The sign is dropped; it travels in a separate hemisphere field.
pub fn gps_to_ddmm(raw: i32) -> DegreesMinutes {
    let magnitude = raw.unsigned_abs();
    let degrees = magnitude / GPS_RAW_PER_DEGREE;
    let minutes_scaled = (magnitude % GPS_RAW_PER_DEGREE) * 60;
    let minutes = minutes_scaled / GPS_RAW_PER_DEGREE;
    let minute_fraction = minutes_scaled - minutes * GPS_RAW_PER_DEGREE;

    DegreesMinutes {
        bp: (degrees * 100 + minutes) as u16,
        ap: (minute_fraction / 1000) as u16,
    }
}

/// Hemisphere letter for a raw coordinate.
pub fn hemisphere(raw: i32, positive: u8, negative: u8) -> u8 {
    if raw < 0 {
        negative
    } else {
        positive
    }
}

/// Bit 31 of a SmartPort lat/long word marks longitude.
pub const LATLONG_LONGITUDE_BIT: u32 = 0x8000_0000;

/// Bit 30 of a SmartPort lat/long word marks south/west.
pub const LATLONG_NEGATIVE_BIT: u32 = 0x4000_0000;

/// SmartPort lat/long word in minutes * 10000: `|raw| * 6 / 100`,
/// computed as `(x + x/2) / 25` to stay inside 32 bits.
pub fn sport_latlong(raw: i32, longitude: bool) -> u32 {
    let magnitude = raw.unsigned_abs();
    latlong_flags((magnitude + magnitude / 2) / 25, raw, longitude)
}

/// Legacy bridge lat/long word: `(|raw| / 100) * 6`.
pub fn legacy_latlong(raw: i32, longitude: bool) -> u32 {
    latlong_flags((raw.unsigned_abs() / 100) * 6, raw, longitude)
}

fn latlong_flags(minutes: u32, raw: i32, longitude: bool) -> u32 {
    let mut word = minutes;
    if longitude {
        word |= LATLONG_LONGITUDE_BIT;
    }
    if raw < 0 {
        word |= LATLONG_NEGATIVE_BIT;
    }
    word
}

/// Cell voltage in the 2 mV steps used by FrSky cell sensors.
fn cell_voltage_steps(battery: &BatteryState) -> Option<u32> {
    battery
        .average_cell_volts()
        .map(|volts| (volts * 500.0).round().max(0.0) as u32)
}

/// Rotates through the pack's cells, one per call.
///
/// Only the pack voltage is measured, so every cell reports the pack
/// average; the index just walks 0..cell_count so displays fill every slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellRotation {
    index: u8,
}

impl CellRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next call will report.
    pub fn current(&self) -> u8 {
        self.index
    }

    fn advance(&mut self, cell_count: u8) -> u8 {
        if self.index >= cell_count {
            self.index = 0;
        }
        let index = self.index;
        self.index = (index + 1) % cell_count;
        index
    }

    /// Hub cell word: `lo = index << 4 | volts[11:8]`, `hi = volts[7:0]`.
    ///
    /// `None` when the cell count is unknown.
    pub fn next_hub(&mut self, battery: &BatteryState) -> Option<i16> {
        let steps = cell_voltage_steps(battery)?;
        let index = u32::from(self.advance(battery.cell_count) & 0x0F);
        let word = ((steps & 0x0FF) << 8) | (index << 4) | ((steps & 0xF00) >> 8);
        Some(word as u16 as i16)
    }

    /// SmartPort cell word: `volts:12 | cell_count:4 | index:4`.
    ///
    /// `None` when the cell count is unknown.
    pub fn next_sport(&mut self, battery: &BatteryState) -> Option<u32> {
        let steps = cell_voltage_steps(battery)?;
        let count = u32::from(battery.cell_count & 0x0F);
        let index = u32::from(self.advance(battery.cell_count) & 0x0F);
        Some(((steps & 0x0FFF) << 8) | (count << 4) | index)
    }
}

/// Legacy bridge cell word carrying two cells starting at `first_cell`:
/// `cell_b:12 | cell_a:12 | cell_count:4 | first_cell:4`.
///
/// `None` when the pack has no cell at `first_cell`.
pub fn legacy_cell_pair(battery: &BatteryState, first_cell: u8) -> Option<u32> {
    if battery.cell_count <= first_cell {
        return None;
    }
    let steps = cell_voltage_steps(battery)? & 0x0FFF;
    let count = u32::from(battery.cell_count & 0x0F);
    Some((steps << 20) | (steps << 8) | (count << 4) | u32::from(first_cell & 0x0F))
}

/// Status flags as decimal digits for the SmartPort T1 field.
///
/// Starts at 10000 so the leading zero is never dropped by the display.
/// Digit weights are a wire contract with existing ground displays.
pub fn status_digits(snapshot: &FlightSnapshot) -> u32 {
    let system = &snapshot.system;
    let mut digits = 10_000;

    if matches!(system.phase, FlightPhase::Ready | FlightPhase::Starting) {
        digits += 1;
    }
    if system.phase == FlightPhase::Preflight {
        digits += 2;
    }
    if system.armed {
        digits += 4;
    }
    if system.angle_mode {
        digits += 10;
    } else {
        digits += 20;
    }
    if system.bypass {
        digits += 40;
    }
    if system.magnetometer_active {
        digits += 100;
    }
    if snapshot.baro.active {
        digits += 200;
    }
    if system.rangefinder_active {
        digits += 400;
    }
    match snapshot.nav.state {
        NavState::HoldingStation => digits += 1000,
        NavState::ReturningHome => digits += 2000,
        _ => {}
    }

    digits
}

/// Hub GPS status: `sats*1000 + fix*100 + valid*10 + origin_valid`.
pub fn hub_gps_status(gps: &GpsState) -> i16 {
    let digits = u32::from(gps.satellites) * 1000
        + u32::from(gps.fix) * 100
        + u32::from(gps.valid) * 10
        + u32::from(gps.origin_valid);
    digits as u16 as i16
}

/// SmartPort T2 GPS status: `valid*1000 + origin_valid*2000 + sats`.
pub fn sport_gps_status(gps: &GpsState) -> u32 {
    u32::from(gps.valid) * 1000 + u32::from(gps.origin_valid) * 2000 + u32::from(gps.satellites)
}

/// Remaining charge in percent, `None` without a configured capacity.
pub fn fuel_percent(battery: &BatteryState) -> Option<i16> {
    if battery.capacity_mah <= 0.0 {
        return None;
    }
    let remaining = 100.0 * (1.0 - battery.charge_used_mah / battery.capacity_mah);
    Some(remaining.clamp(0.0, 100.0) as i16)
}

/// Hub time words from uptime: `(minutes << 8, seconds)`.
///
/// Hours are dropped; flights do not last that long.
pub fn hub_time(uptime_ms: u64) -> (i16, i16) {
    let seconds = uptime_ms / 1000;
    let minutes = (seconds / 60) % 60;
    ((minutes << 8) as i16, (seconds % 60) as i16)
}

/// Round to the nearest signed integer (saturating), as sent on the wire.
pub fn wire_i32(v: f32) -> u32 {
    v.round() as i32 as u32
}

//! # Flight State Snapshot
//!
//! Read-only view of the flight controller state consumed by the encoders.
//!
//! The snapshot is produced outside this crate (estimator, GPS driver,
//! battery monitor) and is never mutated by telemetry code. All fields
//! default to zero/false so a partially filled JSON document still parses.
//!
//! ## Units
//!
//! | Quantity | Unit |
//! |----------|------|
//! | Angles, headings, bearings | radians |
//! | Angular rates | radians/second |
//! | Accelerations | g |
//! | Altitudes, distances | metres |
//! | Ground speed, climb rate | metres/second |
//! | GPS coordinates | 1e-7 degree (raw receiver units) |
//! | Battery voltage / current | volts / amperes |

use serde::Deserialize;

/// Per-axis triple in pitch/roll/yaw order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Axes {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Body-frame acceleration in g.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// GPS receiver state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GpsState {
    /// A GPS receiver is fitted and talking
    pub present: bool,
    /// Current fix is good enough for navigation
    pub valid: bool,
    /// Home position has been recorded
    pub origin_valid: bool,
    /// Fix type reported by the receiver (3 = 3D)
    pub fix: u8,
    pub satellites: u8,
    /// Latitude in 1e-7 degree, negative south
    pub latitude_raw: i32,
    /// Longitude in 1e-7 degree, negative west
    pub longitude_raw: i32,
    pub ground_speed_mps: f32,
    pub altitude_m: f32,
    /// Course over ground
    pub heading_rad: f32,
}

/// Battery monitor state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatteryState {
    /// Pack voltage
    pub volts: f32,
    pub current_a: f32,
    pub charge_used_mah: f32,
    pub capacity_mah: f32,
    pub cell_count: u8,
}

impl BatteryState {
    /// Average cell voltage, `None` when the cell count is unknown.
    pub fn average_cell_volts(&self) -> Option<f32> {
        if self.cell_count == 0 {
            None
        } else {
            Some(self.volts / f32::from(self.cell_count))
        }
    }
}

/// Barometer state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaroState {
    pub active: bool,
    pub altitude_m: f32,
    /// Altitude recorded at arming, subtracted for relative altitude
    pub origin_altitude_m: f32,
    pub temperature_c: f32,
    /// Rate of climb
    pub climb_rate_mps: f32,
}

impl BaroState {
    /// Altitude above the launch point.
    pub fn relative_altitude_m(&self) -> f32 {
        self.altitude_m - self.origin_altitude_m
    }
}

/// Navigation state of the autopilot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    #[default]
    Idle,
    HoldingStation,
    ReturningHome,
    Navigating,
}

/// Top-level flight state machine of the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    #[default]
    Starting,
    Preflight,
    Ready,
    Flying,
    Landing,
    Shutdown,
}

/// Where the aircraft is relative to home, as seen by the pilot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavGeometry {
    pub state: NavState,
    pub distance_m: f32,
    pub bearing_rad: f32,
    pub elevation_rad: f32,
    /// Turn hint for voice guidance back home
    pub hint_rad: f32,
}

/// System and mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemFlags {
    pub phase: FlightPhase,
    pub armed: bool,
    pub angle_mode: bool,
    pub bypass: bool,
    pub magnetometer_active: bool,
    pub rangefinder_active: bool,
}

/// Complete snapshot handed to the encoders each pass.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlightSnapshot {
    /// Time since controller boot
    pub uptime_ms: u64,
    pub attitude: Axes,
    pub rates: Axes,
    pub acceleration: Vector3,
    /// Magnetic heading
    pub compass_heading_rad: f32,
    /// Commanded throttle, 0.0 to 1.0
    pub throttle: f32,
    pub imu_temperature_c: f32,
    pub gps: GpsState,
    pub battery: BatteryState,
    pub baro: BaroState,
    pub nav: NavGeometry,
    pub system: SystemFlags,
}

impl FlightSnapshot {
    /// Parse a snapshot from a JSON document.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Snapshot` if it is not
    /// a valid snapshot document.
    pub async fn load<P: AsRef<std::path::Path>>(path: P) -> crate::error::Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}

/// Radians to degrees, as used by every display field.
pub fn degrees(radians: f32) -> f32 {
    radians.to_degrees()
}

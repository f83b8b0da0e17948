//! # FrSky Protocol Constants and Types
//!
//! Core wire definitions shared by the Hub and SmartPort encoders.

/// Hub frame sentinel (start of packet and frame delimiter)
pub const HUB_SENTINEL: u8 = 0x5E;

/// Hub escape marker
pub const HUB_ESCAPE: u8 = 0x5D;

/// Hub escape mask (0x5E -> 0x3E, 0x5D -> 0x3D)
pub const HUB_ESCAPE_MASK: u8 = 0x60;

/// SmartPort start/stop byte sent by the receiver before every poll
pub const SPORT_START_STOP: u8 = 0x7E;

/// SmartPort byte-stuffing marker
pub const SPORT_ESCAPE: u8 = 0x7D;

/// SmartPort escape mask
pub const SPORT_ESCAPE_MASK: u8 = 0x20;

/// SmartPort data frame marker (first checksummed byte of a reply)
pub const SPORT_DATA_FRAME: u8 = 0x10;

/// SmartPort packet length before stuffing: frame + id(2) + value(4) + crc
pub const SPORT_PACKET_SIZE: usize = 8;

/// Hub packet length before stuffing: sentinel + id + value(2)
pub const HUB_PACKET_SIZE: usize = 4;

/// Physical sensor ids the receiver polls. Only ids a receiver actually
/// polls get an answer; the upper 3 bits are parity.
pub mod sensor_id {
    pub const ID1: u8 = 0x1B;
    pub const ID2: u8 = 0x0D;
    pub const ID3: u8 = 0x34;
    pub const ID4: u8 = 0x67;
}

/// Hub data ids (BP = before decimal point, AP = after decimal point).
pub mod hub_id {
    pub const GPS_ALT_BP: u8 = 0x01;
    /// Barometer temperature, deg C
    pub const TEMP1: u8 = 0x02;
    pub const RPM: u8 = 0x03;
    pub const FUEL: u8 = 0x04;
    /// IMU temperature, deg C
    pub const TEMP2: u8 = 0x05;
    /// Cell voltage word
    pub const VOLTS: u8 = 0x06;
    pub const GPS_ALT_AP: u8 = 0x09;
    pub const BARO_ALT_BP: u8 = 0x10;
    pub const GPS_SPEED_BP: u8 = 0x11;
    pub const GPS_LONG_BP: u8 = 0x12;
    pub const GPS_LAT_BP: u8 = 0x13;
    pub const GPS_COURS_BP: u8 = 0x14;
    pub const GPS_DAY_MONTH: u8 = 0x15;
    pub const GPS_YEAR: u8 = 0x16;
    pub const GPS_HOUR_MIN: u8 = 0x17;
    pub const GPS_SEC: u8 = 0x18;
    /// AP ids sit 8 above their BP ids
    pub const GPS_SPEED_AP: u8 = 0x19;
    pub const GPS_LONG_AP: u8 = 0x1A;
    pub const GPS_LAT_AP: u8 = 0x1B;
    pub const GPS_COURS_AP: u8 = 0x1C;
    /// Satellites/fix/validity digits
    pub const GPS_STAT: u8 = 0x1D;
    pub const BARO_ALT_AP: u8 = 0x21;
    pub const GPS_LONG_EW: u8 = 0x22;
    pub const GPS_LAT_NS: u8 = 0x23;
    /// Accelerations in milli-g
    pub const ACCEL_X: u8 = 0x24;
    pub const ACCEL_Y: u8 = 0x25;
    pub const ACCEL_Z: u8 = 0x26;
    pub const CURRENT: u8 = 0x28;
    /// Metres from home
    pub const WHERE_DIST: u8 = 0x29;
    /// Bearing to the aircraft, deg
    pub const WHERE_BEAR: u8 = 0x2A;
    /// Elevation of the aircraft above the horizon, deg
    pub const WHERE_ELEV: u8 = 0x2B;
    /// Which way to turn to come home
    pub const WHERE_HINT: u8 = 0x2C;
    pub const COMPASS: u8 = 0x2D;
    /// cm/s
    pub const VARIO: u8 = 0x30;
    /// deg/s
    pub const GYRO_X: u8 = 0x31;
    pub const GYRO_Y: u8 = 0x32;
    pub const GYRO_Z: u8 = 0x33;
    /// deg
    pub const PITCH: u8 = 0x34;
    pub const ROLL: u8 = 0x35;
    /// Battery charge consumed
    pub const MAH: u8 = 0x36;
    pub const VFAS: u8 = 0x39;
    pub const VOLTS_BP: u8 = 0x3A;
    pub const VOLTS_AP: u8 = 0x3B;
}

/// SmartPort data ids (OpenTX numbering).
pub mod sport_id {
    pub const SPEED: u16 = 0x0830;
    pub const VFAS: u16 = 0x0210;
    pub const CURRENT: u16 = 0x0200;
    pub const RPM: u16 = 0x050F;
    pub const ALTITUDE: u16 = 0x0100;
    /// Shared with capacity used
    pub const FUEL: u16 = 0x0600;
    pub const ADC1: u16 = 0xF102;
    pub const ADC2: u16 = 0xF103;
    /// Sent twice per rotation: longitude (bit 31 set) and latitude
    pub const LATLONG: u16 = 0x0800;
    pub const VARIO: u16 = 0x0110;
    pub const CELLS: u16 = 0x0300;
    pub const HEADING: u16 = 0x0840;
    pub const ACCX: u16 = 0x0700;
    pub const ACCY: u16 = 0x0710;
    pub const ACCZ: u16 = 0x0720;
    /// Status digits
    pub const T1: u16 = 0x0400;
    /// GPS status digits
    pub const T2: u16 = 0x0410;
    pub const GPS_ALT: u16 = 0x0820;
    pub const A3: u16 = 0x0900;
    /// Average cell voltage
    pub const A4: u16 = 0x0910;
}

/// One Hub data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubValue {
    pub id: u8,
    pub value: i16,
}

impl HubValue {
    pub fn new(id: u8, value: i16) -> Self {
        Self { id, value }
    }
}

/// One SmartPort data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SportValue {
    pub id: u16,
    pub value: u32,
}

impl SportValue {
    pub fn new(id: u16, value: u32) -> Self {
        Self { id, value }
    }
}

/// Byte-stuffing rule: two reserved values are replaced by
/// `[escape, value ^ mask]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stuffing {
    pub reserved: [u8; 2],
    pub escape: u8,
    pub mask: u8,
}

impl Stuffing {
    /// Hub stuffing: 0x5E -> 5D 3E, 0x5D -> 5D 3D
    pub const HUB: Stuffing = Stuffing {
        reserved: [HUB_SENTINEL, HUB_ESCAPE],
        escape: HUB_ESCAPE,
        mask: HUB_ESCAPE_MASK,
    };

    /// SmartPort stuffing: 0x7E -> 7D 5E, 0x7D -> 7D 5D
    pub const SPORT: Stuffing = Stuffing {
        reserved: [SPORT_START_STOP, SPORT_ESCAPE],
        escape: SPORT_ESCAPE,
        mask: SPORT_ESCAPE_MASK,
    };

    /// Whether `byte` must be escaped on the wire.
    pub fn is_reserved(&self, byte: u8) -> bool {
        self.reserved.contains(&byte)
    }
}

//! # Byte Framer
//!
//! Serializes encoded values into Hub or SmartPort framing: sentinel and
//! header bytes, byte stuffing of reserved values and the running checksum.
//!
//! ## Wire layout
//!
//! ```text
//! Hub:       5E | id | lo | hi                (id and value bytes stuffed)
//! SmartPort: 10 | id lo | id hi | v0 v1 v2 v3 | 0xFF - crc   (all stuffed)
//! ```
//!
//! The checksum always covers the value *before* stuffing.

use bytes::{BufMut, BytesMut};

use super::crc::{CarryFold, SportCrc};
use super::protocol::*;
use crate::error::{Result, TelemetryError};

/// Non-blocking transmit sink. Backpressure is the transport's problem.
#[cfg_attr(test, mockall::automock)]
pub trait ByteSink {
    /// Queue one byte for transmission.
    fn write_byte(&mut self, byte: u8);
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

impl ByteSink for BytesMut {
    fn write_byte(&mut self, byte: u8) {
        self.put_u8(byte);
    }
}

/// Write `raw` to `sink`, escaping it when reserved.
///
/// Returns the number of bytes written (1 or 2).
pub fn stuff(stuffing: &Stuffing, raw: u8, sink: &mut dyn ByteSink) -> usize {
    if stuffing.is_reserved(raw) {
        sink.write_byte(stuffing.escape);
        sink.write_byte(raw ^ stuffing.mask);
        2
    } else {
        sink.write_byte(raw);
        1
    }
}

/// Undo byte stuffing on a run of wire bytes that contains no sentinel.
///
/// # Errors
///
/// Returns error when an escape marker is the last byte or is followed by a
/// byte that does not decode to a reserved value.
pub fn unstuff(stuffing: &Stuffing, wire: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(wire.len());
    let mut bytes = wire.iter().copied();

    while let Some(byte) = bytes.next() {
        if byte != stuffing.escape {
            out.push(byte);
            continue;
        }

        let escaped = bytes.next().ok_or_else(|| {
            TelemetryError::Protocol("Dangling escape byte at end of frame".to_string())
        })?;
        let raw = escaped ^ stuffing.mask;

        if !stuffing.is_reserved(raw) {
            return Err(TelemetryError::Protocol(format!(
                "Invalid escape sequence: 0x{:02X} 0x{:02X}",
                byte, escaped
            )));
        }
        out.push(raw);
    }

    Ok(out)
}

/// Frames values onto a byte sink for one protocol family.
///
/// At most one checksum accumulation is live at a time: it starts at the
/// SmartPort header and ends at [`Framer::emit_checksum`].
pub struct Framer<'a> {
    sink: &'a mut dyn ByteSink,
    stuffing: Stuffing,
    fold: Option<CarryFold>,
    crc: Option<SportCrc>,
}

impl<'a> Framer<'a> {
    /// Framer for FrSky Hub packets (no checksum).
    pub fn hub(sink: &'a mut dyn ByteSink) -> Self {
        Self {
            sink,
            stuffing: Stuffing::HUB,
            fold: None,
            crc: None,
        }
    }

    /// Framer for SmartPort packets with the given checksum carry fold.
    pub fn sport(sink: &'a mut dyn ByteSink, fold: CarryFold) -> Self {
        Self {
            sink,
            stuffing: Stuffing::SPORT,
            fold: Some(fold),
            crc: None,
        }
    }

    /// Emit one data byte, stuffed, folding it into the active checksum.
    pub fn emit_byte(&mut self, raw: u8) {
        stuff(&self.stuffing, raw, &mut *self.sink);

        if let Some(crc) = self.crc.as_mut() {
            crc.update(raw);
        }
    }

    /// Emit the packet header.
    ///
    /// Hub: the raw 0x5E sentinel, outside any checksum. Also used as the
    /// frame delimiter after a group of packets.
    /// SmartPort: starts a fresh checksum and emits the 0x10 data frame byte.
    pub fn emit_header(&mut self) {
        match self.fold {
            None => self.sink.write_byte(HUB_SENTINEL),
            Some(fold) => {
                self.crc = Some(SportCrc::new(fold));
                self.emit_byte(SPORT_DATA_FRAME);
            }
        }
    }

    /// Emit `0xFF - crc` and end the checksum accumulation.
    pub fn emit_checksum(&mut self) {
        let trailer = self.crc.take().map_or(0xFF, |crc| crc.trailer());
        stuff(&self.stuffing, trailer, &mut *self.sink);
    }

    /// Emit a full Hub packet: sentinel, id, value little-endian.
    pub fn hub_packet(&mut self, value: HubValue) {
        self.emit_header();
        self.emit_byte(value.id);
        for byte in value.value.to_le_bytes() {
            self.emit_byte(byte);
        }
    }

    /// Emit a full SmartPort packet: data frame, id LE, value LE, trailer.
    pub fn sport_packet(&mut self, value: SportValue) {
        self.emit_header();
        for byte in value.id.to_le_bytes() {
            self.emit_byte(byte);
        }
        for byte in value.value.to_le_bytes() {
            self.emit_byte(byte);
        }
        self.emit_checksum();
    }
}

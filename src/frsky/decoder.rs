//! # FrSky Frame Decoder
//!
//! Decodes Hub and SmartPort downlink bytes back into data items, checking
//! stuffing and checksums. Used to verify encoder output in loopback.

use super::crc::verify_sport_packet;
use super::framer::unstuff;
use super::protocol::*;
use crate::error::{Result, TelemetryError};

/// Decode one SmartPort packet as it appears on the wire (stuffed).
///
/// # Errors
///
/// Returns error if:
/// - Stuffing is invalid
/// - Packet is not 8 bytes once unstuffed
/// - First byte is not the data frame marker
/// - Checksum does not match
pub fn decode_sport_packet(wire: &[u8]) -> Result<SportValue> {
    let raw = unstuff(&Stuffing::SPORT, wire)?;
    decode_raw_sport_packet(&raw)
}

fn decode_raw_sport_packet(raw: &[u8]) -> Result<SportValue> {
    if raw.len() != SPORT_PACKET_SIZE {
        return Err(TelemetryError::Protocol(format!(
            "SmartPort packet must be {} bytes, got {}",
            SPORT_PACKET_SIZE,
            raw.len()
        )));
    }

    if raw[0] != SPORT_DATA_FRAME {
        return Err(TelemetryError::Protocol(format!(
            "Invalid data frame byte: 0x{:02X}",
            raw[0]
        )));
    }

    if !verify_sport_packet(raw) {
        return Err(TelemetryError::Protocol(format!(
            "Checksum mismatch: trailer 0x{:02X}",
            raw[7]
        )));
    }

    let id = u16::from_le_bytes([raw[1], raw[2]]);
    let value = u32::from_le_bytes([raw[3], raw[4], raw[5], raw[6]]);

    Ok(SportValue::new(id, value))
}

/// Decode back-to-back SmartPort packets.
///
/// # Errors
///
/// Returns error if the unstuffed stream is not a whole number of packets
/// or any packet fails to decode.
pub fn decode_sport_stream(wire: &[u8]) -> Result<Vec<SportValue>> {
    let raw = unstuff(&Stuffing::SPORT, wire)?;

    if raw.len() % SPORT_PACKET_SIZE != 0 {
        return Err(TelemetryError::Protocol(format!(
            "Truncated SmartPort stream: {} bytes",
            raw.len()
        )));
    }

    raw.chunks_exact(SPORT_PACKET_SIZE)
        .map(decode_raw_sport_packet)
        .collect()
}

/// Decode a Hub byte stream into frames of packets.
///
/// Packets start with 0x5E; a frame ends where a sentinel is followed
/// directly by another sentinel (or by the end of the stream). Bytes before
/// the first sentinel are ignored.
///
/// # Errors
///
/// Returns error if a packet does not unstuff to exactly id + 2 value bytes.
pub fn decode_hub_frames(wire: &[u8]) -> Result<Vec<Vec<HubValue>>> {
    let mut frames = Vec::new();
    let mut current = Vec::new();

    for segment in wire.split(|&b| b == HUB_SENTINEL).skip(1) {
        if segment.is_empty() {
            if !current.is_empty() {
                frames.push(std::mem::take(&mut current));
            }
            continue;
        }

        let raw = unstuff(&Stuffing::HUB, segment)?;
        if raw.len() != HUB_PACKET_SIZE - 1 {
            return Err(TelemetryError::Protocol(format!(
                "Hub packet must carry 3 bytes, got {}",
                raw.len()
            )));
        }
        current.push(HubValue::new(raw[0], i16::from_le_bytes([raw[1], raw[2]])));
    }

    if !current.is_empty() {
        frames.push(current);
    }

    Ok(frames)
}

/// Decode a Hub byte stream into packets, ignoring frame boundaries.
pub fn decode_hub_stream(wire: &[u8]) -> Result<Vec<HubValue>> {
    Ok(decode_hub_frames(wire)?.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frsky::crc::CarryFold;
    use crate::frsky::framer::Framer;

    #[test]
    fn test_decode_sport_packet() {
        let mut wire: Vec<u8> = Vec::new();
        Framer::sport(&mut wire, CarryFold::Single)
            .sport_packet(SportValue::new(sport_id::T1, 12_766));

        let value = decode_sport_packet(&wire).unwrap();
        assert_eq!(value, SportValue::new(sport_id::T1, 12_766));
    }

    #[test]
    fn test_decode_sport_packet_with_reserved_bytes() {
        let mut wire: Vec<u8> = Vec::new();
        Framer::sport(&mut wire, CarryFold::Double)
            .sport_packet(SportValue::new(0x7D7E, 0x7E7D_7E7D));

        assert!(wire.len() > SPORT_PACKET_SIZE);
        let value = decode_sport_packet(&wire).unwrap();
        assert_eq!(value.id, 0x7D7E);
        assert_eq!(value.value, 0x7E7D_7E7D);
    }

    #[test]
    fn test_decode_sport_packet_bad_checksum() {
        let mut wire: Vec<u8> = Vec::new();
        Framer::sport(&mut wire, CarryFold::Single)
            .sport_packet(SportValue::new(sport_id::VARIO, 150));

        wire[3] ^= 0x01;
        assert!(decode_sport_packet(&wire).is_err());
    }

    #[test]
    fn test_decode_sport_packet_wrong_frame_byte() {
        let raw = [0x32, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0xCC];
        assert!(decode_sport_packet(&raw).is_err());
    }

    #[test]
    fn test_decode_sport_packet_too_short() {
        assert!(decode_sport_packet(&[0x10, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_decode_sport_stream() {
        let mut wire: Vec<u8> = Vec::new();
        let mut framer = Framer::sport(&mut wire, CarryFold::Single);
        framer.sport_packet(SportValue::new(sport_id::ACCX, 98));
        framer.sport_packet(SportValue::new(sport_id::ACCY, (-3i32) as u32));

        let values = decode_sport_stream(&wire).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].value as i32, -3);

        assert!(decode_sport_stream(&wire[..wire.len() - 1]).is_err());
    }

    #[test]
    fn test_decode_hub_frames() {
        let mut wire: Vec<u8> = Vec::new();
        let mut framer = Framer::hub(&mut wire);
        framer.hub_packet(HubValue::new(hub_id::PITCH, -12));
        framer.hub_packet(HubValue::new(hub_id::ROLL, 0x5E5D));
        framer.emit_header();
        framer.hub_packet(HubValue::new(hub_id::TEMP1, 21));
        framer.emit_header();

        let frames = decode_hub_frames(&wire).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0],
            vec![
                HubValue::new(hub_id::PITCH, -12),
                HubValue::new(hub_id::ROLL, 0x5E5D),
            ]
        );
        assert_eq!(frames[1], vec![HubValue::new(hub_id::TEMP1, 21)]);
    }

    #[test]
    fn test_decode_hub_ignores_leading_noise() {
        let wire = [0x01, 0x02, 0x5E, 0x02, 0x19, 0x00, 0x5E];
        let values = decode_hub_stream(&wire).unwrap();
        assert_eq!(values, vec![HubValue::new(hub_id::TEMP1, 25)]);
    }

    #[test]
    fn test_decode_hub_short_packet() {
        assert!(decode_hub_stream(&[0x5E, 0x02, 0x19, 0x5E]).is_err());
    }
}

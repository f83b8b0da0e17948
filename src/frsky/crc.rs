//! # SmartPort Checksum
//!
//! 8-bit end-around-carry sum used by SmartPort packets.
//!
//! Each byte is added to a 16-bit accumulator, the carry is folded back in
//! and the result masked to 8 bits. The transmitted trailer is `0xFF - crc`,
//! so a receiver summing every byte of a packet including the trailer ends
//! at 0xFF.
//!
//! The legacy MAVLink bridge folds the carry twice. After the first fold
//! the accumulator never exceeds 0xFF, so both folds yield the same value.

/// How the carry is folded back after each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarryFold {
    /// `crc += b; crc += crc >> 8; crc &= 0xFF`
    #[default]
    Single,
    /// As `Single`, then the carry fold repeated once more
    Double,
}

/// Running SmartPort checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SportCrc {
    crc: u16,
    fold: CarryFold,
}

impl SportCrc {
    /// Start an accumulation with the given carry fold.
    pub fn new(fold: CarryFold) -> Self {
        Self { crc: 0, fold }
    }

    /// Fold one byte into the accumulator.
    pub fn update(&mut self, byte: u8) {
        self.crc += u16::from(byte);
        self.crc += self.crc >> 8;
        self.crc &= 0x00FF;

        if self.fold == CarryFold::Double {
            self.crc += self.crc >> 8;
            self.crc &= 0x00FF;
        }
    }

    /// Fold a byte slice into the accumulator.
    pub fn update_slice(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Current 8-bit accumulator value.
    pub fn value(&self) -> u8 {
        self.crc as u8
    }

    /// Trailer byte for the accumulated data (`0xFF - crc`).
    pub fn trailer(&self) -> u8 {
        0xFF - self.value()
    }

    /// Clear the accumulator for the next packet.
    pub fn reset(&mut self) {
        self.crc = 0;
    }
}

/// SmartPort checksum of a byte slice.
///
/// # Examples
///
/// ```
/// use frsky_telemetry::frsky::crc::sport_crc;
///
/// assert_eq!(sport_crc(&[0x10, 0x00, 0x01]), 0x11);
/// ```
pub fn sport_crc(data: &[u8]) -> u8 {
    let mut crc = SportCrc::new(CarryFold::Single);
    crc.update_slice(data);
    crc.value()
}

/// Check a de-stuffed packet whose last byte is the trailer.
pub fn verify_sport_packet(packet: &[u8]) -> bool {
    match packet.split_last() {
        Some((&trailer, body)) => 0xFF - sport_crc(body) == trailer,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_empty() {
        assert_eq!(sport_crc(&[]), 0x00);
    }

    #[test]
    fn test_crc_carry_folds_back() {
        // 0xFF + 0x02 = 0x101 -> 0x01 + 0x01 = 0x02
        assert_eq!(sport_crc(&[0xFF, 0x02]), 0x02);
        // 0xFF + 0xFF = 0x1FE -> 0xFE + 0x01 = 0xFF
        assert_eq!(sport_crc(&[0xFF, 0xFF]), 0xFF);
    }

    #[test]
    fn test_incremental_matches_whole_slice() {
        let data: Vec<u8> = (0..=255u8).rev().chain(0..=255u8).collect();

        for split in [0usize, 1, 7, 128, 255, 256, 400, data.len()] {
            let mut crc = SportCrc::new(CarryFold::Single);
            crc.update_slice(&data[..split]);
            crc.update_slice(&data[split..]);
            assert_eq!(crc.value(), sport_crc(&data), "split at {}", split);
        }
    }

    #[test]
    fn test_double_fold_agrees_with_single() {
        let mut single = SportCrc::new(CarryFold::Single);
        let mut double = SportCrc::new(CarryFold::Double);

        for byte in (0..=255u8).cycle().step_by(37).take(2000) {
            single.update(byte);
            double.update(byte);
            assert_eq!(single.value(), double.value());
        }
    }

    #[test]
    fn test_trailer_and_reset() {
        let mut crc = SportCrc::new(CarryFold::Single);
        crc.update_slice(&[0x10, 0x10, 0x02, 0x20, 0x00, 0x00, 0x00]);
        assert_eq!(crc.value(), 0x42);
        assert_eq!(crc.trailer(), 0xBD);

        crc.reset();
        assert_eq!(crc.value(), 0);
    }

    #[test]
    fn test_verify_sport_packet() {
        let body = [0x10, 0x00, 0x01, 0x2A, 0x00, 0x00, 0x00];
        let mut packet = body.to_vec();
        packet.push(0xFF - sport_crc(&body));
        assert!(verify_sport_packet(&packet));

        packet[3] ^= 0x01;
        assert!(!verify_sport_packet(&packet));
        assert!(!verify_sport_packet(&[]));
    }
}

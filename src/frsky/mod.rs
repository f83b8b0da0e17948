//! # FrSky Protocol Module
//!
//! Wire-level pieces shared by the FrSky Hub and SmartPort encoders.
//!
//! This module handles:
//! - Data ids and frame constants for both protocol families
//! - Byte stuffing and the SmartPort end-around-carry checksum
//! - Value scaling (BP/AP pairs, degrees-minutes, cell words, status digits)
//! - Decoding of downlink bytes for loopback verification

pub mod protocol;
pub mod crc;
pub mod framer;
pub mod encoding;
pub mod decoder;

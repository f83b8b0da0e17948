//! # FrSky Telemetry Library
//!
//! Downlink telemetry encoders for flight controllers talking to FrSky
//! receivers.
//!
//! This library turns a snapshot of flight state into FrSky Hub frames or
//! SmartPort poll replies, and drives them over a serial port.

pub mod config;
pub mod error;
pub mod frsky;
pub mod serial;
pub mod state;
pub mod telemetry;

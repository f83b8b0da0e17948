//! # SmartPort Poll Tracker
//!
//! Follows the receiver's polling on a half-duplex SmartPort line and
//! decides when the sensor may answer.
//!
//! ## States
//!
//! ```text
//! Uninitialized --configure--> Initialized --poll--> Working
//!                                  |                    |
//!                                  +-----silence--------+--> TimedOut
//! ```
//!
//! A poll is the start/stop byte 0x7E directly followed by our sensor id,
//! with nothing else already waiting in the receive buffer. Anything else
//! on the line is ignored.

use std::time::Duration;

use tracing::{debug, warn};

use crate::frsky::protocol::SPORT_START_STOP;

/// Default window without a valid poll before the link is declared dead.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(7);

/// Link state of the SmartPort sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    /// Port not configured yet
    #[default]
    Uninitialized,
    /// Configured, no poll seen yet
    Initialized,
    /// Receiver is polling us
    Working,
    /// Receiver went silent
    TimedOut,
}

/// SmartPort poll detector and inactivity watchdog.
#[derive(Debug, Clone)]
pub struct PollTracker {
    state: PollState,
    sensor_id: u8,
    timeout: Duration,
    last_byte: Option<u8>,
    pending: bool,
    last_request: Duration,
}

impl PollTracker {
    pub fn new(sensor_id: u8, timeout: Duration) -> Self {
        Self {
            state: PollState::Uninitialized,
            sensor_id,
            timeout,
            last_byte: None,
            pending: false,
            last_request: Duration::ZERO,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn sensor_id(&self) -> u8 {
        self.sensor_id
    }

    /// Port (re)configured: start listening from a clean slate.
    ///
    /// The inactivity window restarts at `now`.
    pub fn configure(&mut self, now: Duration) {
        debug!("SmartPort sensor 0x{:02X} listening", self.sensor_id);
        self.state = PollState::Initialized;
        self.last_byte = None;
        self.pending = false;
        self.last_request = now;
    }

    /// Whether replies may be sent in the current state.
    pub fn is_active(&self) -> bool {
        matches!(self.state, PollState::Initialized | PollState::Working)
    }

    /// Feed one received byte.
    ///
    /// Returns `true` when the byte completes a valid poll for our sensor.
    /// A poll is not accepted while more received bytes are pending, since
    /// the line is no longer ours to drive.
    pub fn on_byte(&mut self, byte: u8, rx_pending: bool, now: Duration) -> bool {
        let previous = self.last_byte.replace(byte);

        if !self.is_active() || rx_pending {
            return false;
        }

        if previous == Some(SPORT_START_STOP) && byte == self.sensor_id {
            if self.state == PollState::Initialized {
                debug!("SmartPort receiver is polling sensor 0x{:02X}", self.sensor_id);
            }
            self.state = PollState::Working;
            self.pending = true;
            self.last_request = now;
            return true;
        }

        false
    }

    /// Move to `TimedOut` when no valid poll arrived within the window.
    ///
    /// Returns `true` on the transition.
    pub fn check_timeout(&mut self, now: Duration) -> bool {
        if !self.is_active() {
            return false;
        }

        if now.saturating_sub(self.last_request) > self.timeout {
            warn!(
                "No SmartPort poll for {:?}, sensor 0x{:02X} timed out",
                self.timeout, self.sensor_id
            );
            self.state = PollState::TimedOut;
            self.pending = false;
            return true;
        }

        false
    }

    /// A poll is waiting for an answer.
    pub fn has_request(&self) -> bool {
        self.pending
    }

    /// Consume the pending poll, if any.
    pub fn take_request(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

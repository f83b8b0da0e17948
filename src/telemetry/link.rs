//! # Telemetry Link
//!
//! Drives one [`TelemetryEncoder`] over a serial port: periodic ticks,
//! inbound bytes, and the latest flight state from a watch channel.
//!
//! Encoders write into an in-memory buffer; the link flushes it to the port
//! after every tick or received chunk. Write failures are counted and
//! logged, never fatal.

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::TelemetryEncoder;
use crate::error::{Result, TelemetryError};
use crate::serial::SerialPortIO;
use crate::state::FlightSnapshot;

/// Receive buffer size; a SmartPort poll is two bytes.
const RX_BUFFER_SIZE: usize = 64;

/// Transmit buffer capacity; a full Hub fast frame stays well below it.
const TX_BUFFER_CAPACITY: usize = 256;

/// Counters reported when the link stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub ticks: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub write_errors: u64,
    pub timeouts: u64,
}

/// A telemetry encoder bound to a serial port.
pub struct TelemetryLink<P: SerialPortIO> {
    port: P,
    encoder: Box<dyn TelemetryEncoder>,
    snapshot: watch::Receiver<FlightSnapshot>,
    tx: BytesMut,
    started: Instant,
    stats: LinkStats,
}

impl<P: SerialPortIO> TelemetryLink<P> {
    /// Bind `encoder` to `port`. Encoder time starts now.
    pub fn new(
        port: P,
        encoder: Box<dyn TelemetryEncoder>,
        snapshot: watch::Receiver<FlightSnapshot>,
    ) -> Self {
        Self {
            port,
            encoder,
            snapshot,
            tx: BytesMut::with_capacity(TX_BUFFER_CAPACITY),
            started: Instant::now(),
            stats: LinkStats::default(),
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    /// Run one encoder tick and send what it produced.
    ///
    /// A SmartPort encoder that timed out is reconfigured so it listens
    /// for the receiver again.
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the port write fails.
    pub async fn tick(&mut self) -> Result<usize> {
        let now = self.now();
        self.stats.ticks += 1;

        {
            let snapshot = self.snapshot.borrow();
            self.encoder.on_tick(&snapshot, now, &mut self.tx);
        }

        if self.encoder.is_timed_out() {
            self.stats.timeouts += 1;
            info!("{} link lost, listening for the receiver again", self.encoder.protocol());
            self.encoder.reconfigure(now);
        }

        self.flush().await
    }

    /// Feed received bytes to the encoder and send any replies.
    ///
    /// A poll left pending by the last byte is answered right away.
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the port write fails.
    pub async fn receive(&mut self, bytes: &[u8]) -> Result<usize> {
        let now = self.now();
        self.stats.bytes_received += bytes.len() as u64;

        {
            let snapshot = self.snapshot.borrow();
            for (i, &byte) in bytes.iter().enumerate() {
                let rx_pending = i + 1 < bytes.len();
                self.encoder
                    .on_byte_received(byte, rx_pending, &snapshot, now, &mut self.tx);
            }

            if self.encoder.has_pending_request() {
                self.encoder.on_tick(&snapshot, now, &mut self.tx);
            }
        }

        self.flush().await
    }

    async fn flush(&mut self) -> Result<usize> {
        if self.tx.is_empty() {
            return Ok(0);
        }

        let frame = self.tx.split().freeze();

        self.port.write_all(&frame).await
            .map_err(|e| TelemetryError::Serial(format!("Failed to write telemetry: {}", e)))?;

        self.port.flush().await
            .map_err(|e| TelemetryError::Serial(format!("Failed to flush serial port: {}", e)))?;

        self.stats.bytes_sent += frame.len() as u64;
        Ok(frame.len())
    }

    /// Run until `shutdown` completes, then return the link counters.
    ///
    /// Ticks every `tick_period`. Stops reading when the receive side
    /// closes or fails but keeps ticking.
    pub async fn run<F>(mut self, tick_period: Duration, shutdown: F) -> LinkStats
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut rx_buf = [0u8; RX_BUFFER_SIZE];
        let mut rx_open = true;
        tokio::pin!(shutdown);

        info!("{} telemetry running, tick every {:?}", self.encoder.protocol(), tick_period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        self.stats.write_errors += 1;
                        warn!("{}", e);
                    }
                }

                read = self.port.read(&mut rx_buf), if rx_open => {
                    match read {
                        Ok(0) => {
                            debug!("Serial receive side closed");
                            rx_open = false;
                        }
                        Ok(n) => {
                            if let Err(e) = self.receive(&rx_buf[..n]).await {
                                self.stats.write_errors += 1;
                                warn!("{}", e);
                            }
                        }
                        Err(e) => {
                            warn!("Serial read failed, receive disabled: {}", e);
                            rx_open = false;
                        }
                    }
                }

                _ = &mut shutdown => {
                    info!("Telemetry link stopping");
                    break;
                }
            }
        }

        info!(
            "Link stats: {} ticks, {} bytes sent, {} bytes received, {} write errors",
            self.stats.ticks, self.stats.bytes_sent, self.stats.bytes_received, self.stats.write_errors
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HubConfig, LegacyConfig, SmartPortConfig};
    use crate::frsky::decoder::{decode_hub_frames, decode_sport_packet, decode_sport_stream};
    use crate::frsky::protocol::{sensor_id, sport_id};
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::telemetry::hub::HubEncoder;
    use crate::telemetry::legacy::LegacyEncoder;
    use crate::telemetry::smartport::SmartPortEncoder;
    use std::io;

    fn smartport_link(port: MockSerialPort) -> (TelemetryLink<MockSerialPort>, watch::Sender<FlightSnapshot>) {
        let mut encoder = SmartPortEncoder::new(&SmartPortConfig::default());
        encoder.reconfigure(Duration::ZERO);
        let (tx, rx) = watch::channel(FlightSnapshot::default());
        (TelemetryLink::new(port, Box::new(encoder), rx), tx)
    }

    #[tokio::test]
    async fn test_hub_tick_writes_one_frame() {
        let port = MockSerialPort::new();
        let (_tx, rx) = watch::channel(FlightSnapshot::default());
        let mut link = TelemetryLink::new(port.clone(), Box::new(HubEncoder::new(HubConfig::default())), rx);

        let sent = tokio_test::assert_ok!(link.tick().await);
        assert!(sent > 0);

        let written = port.get_written_data();
        assert_eq!(written.len(), 1);
        assert_eq!(decode_hub_frames(&written[0]).unwrap().len(), 1);
        assert_eq!(link.stats().bytes_sent, sent as u64);
    }

    #[tokio::test]
    async fn test_smartport_poll_answered_on_receive() {
        let port = MockSerialPort::new();
        let (mut link, _tx) = smartport_link(port.clone());

        let sent = link.receive(&[0x7E, sensor_id::ID1]).await.unwrap();
        assert_eq!(sent, 8);

        let value = decode_sport_packet(&port.get_written_bytes()).unwrap();
        assert_eq!(value.id, sport_id::VFAS);
    }

    #[tokio::test]
    async fn test_smartport_poll_split_across_reads() {
        let port = MockSerialPort::new();
        let (mut link, _tx) = smartport_link(port.clone());

        assert_eq!(link.receive(&[0x7E]).await.unwrap(), 0);
        assert_eq!(link.receive(&[sensor_id::ID1]).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_smartport_poll_followed_by_more_bytes_ignored() {
        let port = MockSerialPort::new();
        let (mut link, _tx) = smartport_link(port.clone());

        let sent = link.receive(&[0x7E, sensor_id::ID1, 0x7E]).await.unwrap();
        assert_eq!(sent, 0);
        assert!(port.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_smartport_uses_latest_snapshot() {
        let port = MockSerialPort::new();
        let (mut link, tx) = smartport_link(port.clone());

        let mut snapshot = FlightSnapshot::default();
        snapshot.battery.volts = 11.1;
        tx.send_replace(snapshot);

        link.receive(&[0x7E, sensor_id::ID1]).await.unwrap();
        let value = decode_sport_packet(&port.get_written_bytes()).unwrap();
        assert_eq!(value.value, 1110);
    }

    #[tokio::test]
    async fn test_legacy_replies_from_receive_path() {
        let port = MockSerialPort::new();
        let (_tx, rx) = watch::channel(FlightSnapshot::default());
        let encoder = LegacyEncoder::new(&LegacyConfig::default());
        let mut link = TelemetryLink::new(port.clone(), Box::new(encoder), rx);

        // Slot 0 needs a 3D fix; slot 1 (RPM) always answers
        link.receive(&[0x7E, sensor_id::ID2]).await.unwrap();
        link.receive(&[0x7E, sensor_id::ID3]).await.unwrap();
        assert_eq!(link.tick().await.unwrap(), 0);

        let values = decode_sport_stream(&port.get_written_bytes()).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].id, sport_id::RPM);
    }

    #[tokio::test]
    async fn test_write_error_is_reported() {
        let port = MockSerialPort::new();
        port.set_write_error(io::ErrorKind::BrokenPipe);
        let (_tx, rx) = watch::channel(FlightSnapshot::default());
        let mut link = TelemetryLink::new(port.clone(), Box::new(HubEncoder::new(HubConfig::default())), rx);

        match link.tick().await {
            Err(TelemetryError::Serial(msg)) => assert!(msg.contains("Failed to write")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert_eq!(link.stats().bytes_sent, 0);

        // The failed frame is dropped, not resent
        port.write_error.lock().unwrap().take();
        let sent = link.tick().await.unwrap();
        assert_eq!(decode_hub_frames(&port.get_written_bytes()).unwrap().len(), 1);
        assert_eq!(link.stats().bytes_sent, sent as u64);
    }

    #[tokio::test]
    async fn test_flush_error_is_reported() {
        let port = MockSerialPort::new();
        port.set_flush_error(io::ErrorKind::TimedOut);
        let (_tx, rx) = watch::channel(FlightSnapshot::default());
        let mut link = TelemetryLink::new(port, Box::new(HubEncoder::new(HubConfig::default())), rx);

        assert!(matches!(link.tick().await, Err(TelemetryError::Serial(_))));
    }

    #[tokio::test]
    async fn test_timed_out_encoder_is_reconfigured() {
        let port = MockSerialPort::new();
        let config = SmartPortConfig {
            inactivity_timeout_ms: 100,
            ..SmartPortConfig::default()
        };
        let mut encoder = SmartPortEncoder::new(&config);
        encoder.reconfigure(Duration::ZERO);
        let (_tx, rx) = watch::channel(FlightSnapshot::default());
        let mut link = TelemetryLink::new(port.clone(), Box::new(encoder), rx);

        tokio::time::sleep(Duration::from_millis(150)).await;
        link.tick().await.unwrap();
        assert_eq!(link.stats().timeouts, 1);

        // Listening again right away
        assert_eq!(link.receive(&[0x7E, sensor_id::ID1]).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_run_answers_polls_until_shutdown() {
        let port = MockSerialPort::new();
        port.push_rx(&[0x7E, sensor_id::ID1]);
        port.push_rx(&[0x7E, sensor_id::ID2]);
        port.push_rx(&[0x7E, sensor_id::ID1]);
        let (link, _tx) = smartport_link(port.clone());

        let stats = link
            .run(Duration::from_millis(5), tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(stats.bytes_received, 6);
        assert_eq!(stats.write_errors, 0);
        assert!(stats.ticks >= 1);

        let values = decode_sport_stream(&port.get_written_bytes()).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].id, sport_id::VFAS);
        assert_eq!(values[1].id, sport_id::CURRENT);
    }

    #[test]
    fn test_run_with_tokio_test_block_on() {
        let port = MockSerialPort::new();
        let (_tx, rx) = watch::channel(FlightSnapshot::default());
        let link = TelemetryLink::new(port.clone(), Box::new(HubEncoder::new(HubConfig::default())), rx);

        let stats = tokio_test::block_on(async {
            link.run(Duration::from_millis(10), async {}).await
        });

        // Shutdown may win the first select, so at most one tick ran
        assert!(stats.ticks <= 1);
        assert_eq!(stats.write_errors, 0);
    }
}

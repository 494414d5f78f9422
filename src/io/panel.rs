//! Serial link to the door panel (readers, sensors, strike, buzzer)
//!
//! Protocol:
//! - 8N1, baud from config
//! - Command frame (host -> panel): 8 bytes, starts with 0x7E
//! - Event frame (panel -> host): 12 bytes, starts with 0x7F
//! - Checksum: sum all preceding bytes, bitwise NOT

use crate::domain::types::{InputEvent, VerificationEvent};
use crate::infra::config::Config;
use crate::services::lock::LockCmd;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info, trace, warn};

// Protocol constants
const START_BYTE_COMMAND: u8 = 0x7E;
const START_BYTE_EVENT: u8 = 0x7F;
const CMD_UNLOCK: u8 = 0x20;
const CMD_BUZZ: u8 = 0x21;
const COMMAND_FRAME_LEN: usize = 8;
const EVENT_FRAME_LEN: usize = 12;

// Event kinds reported by the panel
const EVENT_CARD: u8 = 0x01;
const EVENT_FINGERPRINT: u8 = 0x02;
const EVENT_PASSWORD: u8 = 0x03;
const EVENT_SENSORS: u8 = 0x04;

const SENSOR_BIT_DOOR_OPEN: u8 = 0x01;
const SENSOR_BIT_TAMPER: u8 = 0x02;

/// What a single panel frame decoded to
#[derive(Debug, PartialEq)]
enum PanelEvent {
    Verification(VerificationEvent),
    Sensors { door_open: bool, tamper: bool },
}

/// Build an 8-byte command frame with trailing checksum
fn build_command_frame(cmd: u8, data: [u8; 3]) -> [u8; COMMAND_FRAME_LEN] {
    let mut frame = [0u8; COMMAND_FRAME_LEN];
    frame[0] = START_BYTE_COMMAND;
    frame[1] = 0x00; // Reserved
    frame[2] = 0x01; // Panel address, single-panel bus
    frame[3] = cmd;
    frame[4] = data[0];
    frame[5] = data[1];
    frame[6] = data[2];

    let sum: u8 = frame[..7].iter().fold(0u8, |acc, &x| acc.wrapping_add(x));
    frame[7] = !sum;

    frame
}

/// Encode an actuator command as a panel frame.
///
/// Durations ride as little-endian u16 milliseconds; buzzer frequency is
/// sent in 10 Hz steps so it fits one byte.
fn encode_lock_cmd(cmd: &LockCmd) -> [u8; COMMAND_FRAME_LEN] {
    match cmd {
        LockCmd::Unlock { duration_ms } => {
            let ms = (*duration_ms).min(u32::from(u16::MAX)) as u16;
            build_command_frame(CMD_UNLOCK, [ms as u8, (ms >> 8) as u8, 0x00])
        }
        LockCmd::Buzz { duration_ms, freq_hz } => {
            let ms = (*duration_ms).min(u32::from(u16::MAX)) as u16;
            let freq = (*freq_hz / 10).min(255) as u8;
            build_command_frame(CMD_BUZZ, [ms as u8, (ms >> 8) as u8, freq])
        }
    }
}

/// Parse a 12-byte event frame into a panel event.
///
/// Layout: start, kind, payload_len, payload[8], checksum.
fn parse_event_frame(data: &[u8]) -> Option<PanelEvent> {
    if data.len() != EVENT_FRAME_LEN {
        warn!(len = data.len(), expected = EVENT_FRAME_LEN, "panel_invalid_frame_length");
        return None;
    }

    if data[0] != START_BYTE_EVENT {
        warn!(byte = data[0], expected = START_BYTE_EVENT, "panel_invalid_start_byte");
        return None;
    }

    // Validate checksum: sum all bytes (including checksum), add 1, should be 0
    let sum: u8 = data.iter().fold(0u8, |acc, &x| acc.wrapping_add(x));
    if sum.wrapping_add(1) != 0 {
        let hex_dump: String =
            data.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ");
        warn!(sum = %sum, raw_bytes = %hex_dump, "panel_checksum_failed");
        return None;
    }

    let kind = data[1];
    let payload_len = data[2] as usize;
    if payload_len > 8 {
        warn!(payload_len = payload_len, "panel_invalid_payload_length");
        return None;
    }
    let payload = &data[3..3 + payload_len];

    match kind {
        EVENT_CARD => {
            if payload.is_empty() {
                warn!("panel_empty_card_uid");
                return None;
            }
            Some(PanelEvent::Verification(VerificationEvent::Card(hex::encode(payload))))
        }
        EVENT_FINGERPRINT => {
            if payload.len() != 2 {
                warn!(payload_len = payload.len(), "panel_invalid_fingerprint_payload");
                return None;
            }
            let template = u16::from_le_bytes([payload[0], payload[1]]);
            Some(PanelEvent::Verification(VerificationEvent::Fingerprint(template)))
        }
        EVENT_PASSWORD => match std::str::from_utf8(payload) {
            Ok(pin) if !pin.is_empty() => {
                Some(PanelEvent::Verification(VerificationEvent::Password(pin.to_string())))
            }
            _ => {
                warn!("panel_invalid_password_payload");
                None
            }
        },
        EVENT_SENSORS => {
            if payload.len() != 1 {
                warn!(payload_len = payload.len(), "panel_invalid_sensor_payload");
                return None;
            }
            Some(PanelEvent::Sensors {
                door_open: payload[0] & SENSOR_BIT_DOOR_OPEN != 0,
                tamper: payload[0] & SENSOR_BIT_TAMPER != 0,
            })
        }
        other => {
            debug!(kind = other, "panel_unknown_event_kind");
            None
        }
    }
}

/// Serial panel monitor: decodes inbound event frames into input events
/// and writes queued actuator commands out on the same bus.
pub struct PanelMonitor {
    device: String,
    baud: u32,
    event_tx: mpsc::Sender<InputEvent>,
    lock_rx: mpsc::Receiver<LockCmd>,
    /// Persistent read buffer that accumulates bytes across reads.
    /// Event frames can arrive in chunks, so partial data is kept for
    /// the next read.
    read_buffer: Vec<u8>,
}

impl PanelMonitor {
    pub fn new(
        config: &Config,
        event_tx: mpsc::Sender<InputEvent>,
        lock_rx: mpsc::Receiver<LockCmd>,
    ) -> Self {
        Self {
            device: config.panel_device().to_string(),
            baud: config.panel_baud(),
            event_tx,
            lock_rx,
            read_buffer: Vec::with_capacity(64),
        }
    }

    /// Synchronize the read buffer to start with the event start byte.
    /// Discards any bytes before it.
    fn synchronize_buffer(&mut self) {
        if self.read_buffer.is_empty() || self.read_buffer[0] == START_BYTE_EVENT {
            return;
        }

        if let Some(start_idx) = self.read_buffer.iter().position(|&b| b == START_BYTE_EVENT) {
            if start_idx > 0 {
                debug!(discarded = start_idx, "panel_sync_discarded_bytes");
                self.read_buffer.drain(..start_idx);
            }
        } else {
            debug!(discarded = self.read_buffer.len(), "panel_sync_no_start_byte");
            self.read_buffer.clear();
        }
    }

    /// Drain every complete frame currently in the buffer and forward
    /// the decoded events.
    fn drain_frames(&mut self) {
        loop {
            self.synchronize_buffer();
            if self.read_buffer.len() < EVENT_FRAME_LEN {
                return;
            }

            let frame: Vec<u8> = self.read_buffer.drain(..EVENT_FRAME_LEN).collect();
            if !self.read_buffer.is_empty() {
                trace!(leftover = self.read_buffer.len(), "panel_frame_leftover_bytes");
            }

            let Some(event) = parse_event_frame(&frame) else {
                // Bad frame, resynchronize on whatever follows
                continue;
            };

            let received_at = Instant::now();
            let input = match event {
                PanelEvent::Verification(event) => {
                    info!(method = %event.method(), "panel_verification_event");
                    InputEvent::Verification { event, received_at }
                }
                PanelEvent::Sensors { door_open, tamper } => {
                    trace!(door_open = door_open, tamper = tamper, "panel_sensor_report");
                    InputEvent::Sensors { door_open, tamper, received_at }
                }
            };

            // try_send keeps the serial loop non-blocking under load
            if let Err(e) = self.event_tx.try_send(input) {
                warn!(error = %e, "panel_event_dropped");
            }
        }
    }

    /// Start the panel loop: reads event frames and writes actuator
    /// command frames until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(device = %self.device, baud = %self.baud, "panel_monitor_started");

        let port_result = tokio_serial::new(&self.device, self.baud)
            .timeout(Duration::from_millis(100))
            .open_native_async();

        let port = match port_result {
            Ok(p) => {
                info!(device = %self.device, "panel_port_opened");
                p
            }
            Err(e) => {
                error!(device = %self.device, error = %e, "panel_port_open_failed");
                // Without the bus there is nothing to read; drain actuator
                // commands so callers see a full queue, not a hang
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!("panel_shutdown");
                                return;
                            }
                        }
                        cmd = self.lock_rx.recv() => {
                            match cmd {
                                Some(cmd) => warn!(cmd = ?cmd, "panel_command_dropped_no_port"),
                                None => return,
                            }
                        }
                    }
                }
            }
        };

        let (mut reader, mut writer) = tokio::io::split(port);
        let mut temp_buf = [0u8; 64];

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("panel_shutdown");
                        return;
                    }
                }
                result = reader.read(&mut temp_buf) => {
                    match result {
                        Ok(0) => {
                            // Serial reads return 0 on timeout, nothing to do
                        }
                        Ok(n) => {
                            self.read_buffer.extend_from_slice(&temp_buf[..n]);
                            self.drain_frames();
                        }
                        Err(e) if e.kind() == ErrorKind::TimedOut => {}
                        Err(e) => {
                            error!(error = %e, "panel_read_error");
                            return;
                        }
                    }
                }
                cmd = self.lock_rx.recv() => {
                    let Some(cmd) = cmd else {
                        info!("panel_command_channel_closed");
                        return;
                    };
                    let frame = encode_lock_cmd(&cmd);
                    if let Err(e) = writer.write_all(&frame).await {
                        error!(error = %e, cmd = ?cmd, "panel_write_error");
                    } else {
                        debug!(cmd = ?cmd, "panel_command_sent");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event_frame(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; EVENT_FRAME_LEN];
        frame[0] = START_BYTE_EVENT;
        frame[1] = kind;
        frame[2] = payload.len() as u8;
        frame[3..3 + payload.len()].copy_from_slice(payload);
        let sum: u8 = frame[..EVENT_FRAME_LEN - 1].iter().fold(0u8, |acc, &x| acc.wrapping_add(x));
        frame[EVENT_FRAME_LEN - 1] = !sum;
        frame
    }

    #[test]
    fn test_unlock_frame_checksum() {
        let frame = encode_lock_cmd(&LockCmd::Unlock { duration_ms: 3000 });

        assert_eq!(frame.len(), COMMAND_FRAME_LEN);
        assert_eq!(frame[0], START_BYTE_COMMAND);
        assert_eq!(frame[3], CMD_UNLOCK);
        // 3000 ms little-endian
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), 3000);

        // Verify checksum: sum + checksum + 1 = 0
        let sum: u8 = frame.iter().fold(0u8, |acc, &x| acc.wrapping_add(x));
        assert_eq!(sum.wrapping_add(1), 0);
    }

    #[test]
    fn test_buzz_frame_encodes_frequency_steps() {
        let frame = encode_lock_cmd(&LockCmd::Buzz { duration_ms: 500, freq_hz: 2000 });

        assert_eq!(frame[3], CMD_BUZZ);
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), 500);
        assert_eq!(frame[6], 200); // 2000 Hz in 10 Hz steps
    }

    #[test]
    fn test_parse_card_event() {
        let frame = make_event_frame(EVENT_CARD, &[0x12, 0x34, 0x56, 0x78]);
        let event = parse_event_frame(&frame).unwrap();
        assert_eq!(
            event,
            PanelEvent::Verification(VerificationEvent::Card("12345678".to_string()))
        );
    }

    #[test]
    fn test_parse_fingerprint_event() {
        let frame = make_event_frame(EVENT_FINGERPRINT, &42u16.to_le_bytes());
        let event = parse_event_frame(&frame).unwrap();
        assert_eq!(event, PanelEvent::Verification(VerificationEvent::Fingerprint(42)));
    }

    #[test]
    fn test_parse_password_event() {
        let frame = make_event_frame(EVENT_PASSWORD, b"123456");
        let event = parse_event_frame(&frame).unwrap();
        assert_eq!(
            event,
            PanelEvent::Verification(VerificationEvent::Password("123456".to_string()))
        );
    }

    #[test]
    fn test_parse_sensor_event() {
        let frame = make_event_frame(EVENT_SENSORS, &[SENSOR_BIT_DOOR_OPEN | SENSOR_BIT_TAMPER]);
        let event = parse_event_frame(&frame).unwrap();
        assert_eq!(event, PanelEvent::Sensors { door_open: true, tamper: true });

        let frame = make_event_frame(EVENT_SENSORS, &[0x00]);
        let event = parse_event_frame(&frame).unwrap();
        assert_eq!(event, PanelEvent::Sensors { door_open: false, tamper: false });
    }

    #[test]
    fn test_corrupt_checksum_rejected() {
        let mut frame = make_event_frame(EVENT_CARD, &[0xAA, 0xBB, 0xCC, 0xDD]);
        frame[5] ^= 0xFF;
        assert!(parse_event_frame(&frame).is_none());
    }

    #[test]
    fn test_wrong_start_byte_rejected() {
        let mut frame = make_event_frame(EVENT_SENSORS, &[0x01]);
        frame[0] = 0x00;
        assert!(parse_event_frame(&frame).is_none());
    }

    #[tokio::test]
    async fn test_drain_frames_across_chunked_reads() {
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let (_lock_tx, lock_rx) = mpsc::channel(8);
        let mut monitor = PanelMonitor::new(&Config::default(), event_tx, lock_rx);

        let frame = make_event_frame(EVENT_FINGERPRINT, &7u16.to_le_bytes());

        // Garbage prefix, then the frame split across two reads
        monitor.read_buffer.extend_from_slice(&[0x00, 0x55]);
        monitor.read_buffer.extend_from_slice(&frame[..5]);
        monitor.drain_frames();
        assert!(event_rx.try_recv().is_err());

        monitor.read_buffer.extend_from_slice(&frame[5..]);
        monitor.drain_frames();

        match event_rx.try_recv().unwrap() {
            InputEvent::Verification { event, .. } => {
                assert_eq!(event, VerificationEvent::Fingerprint(7));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_two_frames_in_one_read() {
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let (_lock_tx, lock_rx) = mpsc::channel(8);
        let mut monitor = PanelMonitor::new(&Config::default(), event_tx, lock_rx);

        let a = make_event_frame(EVENT_SENSORS, &[SENSOR_BIT_DOOR_OPEN]);
        let b = make_event_frame(EVENT_SENSORS, &[0x00]);
        monitor.read_buffer.extend_from_slice(&a);
        monitor.read_buffer.extend_from_slice(&b);
        monitor.drain_frames();

        assert!(matches!(
            event_rx.try_recv().unwrap(),
            InputEvent::Sensors { door_open: true, tamper: false, .. }
        ));
        assert!(matches!(
            event_rx.try_recv().unwrap(),
            InputEvent::Sensors { door_open: false, tamper: false, .. }
        ));
    }
}

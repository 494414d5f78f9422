//! Typed channel for MQTT egress messages
//!
//! Provides a non-blocking way to hand publishable payloads to the MQTT
//! publisher. Uses a bounded mpsc channel to prevent unbounded memory
//! growth; a decision enqueues its record before `decide` returns, so
//! callers can treat the event pipeline as complete at that point.

use crate::domain::types::{epoch_ms, AccessOutcome, UserId};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Messages that can be sent to the MQTT publisher
#[derive(Debug)]
pub enum EgressMessage {
    /// Canonical audit record, one per decision
    AccessRecord(AccessRecordPayload),
    /// Alarm event (lockout, tamper, tamper_clear, actuator)
    Alarm(AlarmPayload),
    /// Device status snapshot
    Status(StatusPayload),
    /// Online/offline liveness marker
    Liveness(LivenessPayload),
}

/// Canonical audit record for one decision
#[derive(Debug, Clone, Serialize)]
pub struct AccessRecordPayload {
    /// UUIDv7 so QoS 1 re-deliveries dedup downstream
    pub event_id: Uuid,
    /// Enrolled user id, 0 for remote unlocks and unmatched credentials
    pub user_id: u32,
    /// Modality: card, finger, password, remote
    pub method: String,
    /// success | failed
    pub result: String,
    /// Present on denials only: no_match | locked_out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Epoch milliseconds
    pub timestamp: u64,
}

impl AccessRecordPayload {
    /// Build the record for a decision outcome
    pub fn from_outcome(outcome: &AccessOutcome) -> Self {
        let (user_id, result, reason) = match outcome {
            AccessOutcome::Granted { user_id, .. } => (*user_id, "success", None),
            AccessOutcome::Denied { reason, .. } => {
                (UserId::UNATTRIBUTED, "failed", Some(reason.as_str().to_string()))
            }
        };
        Self {
            event_id: Uuid::now_v7(),
            user_id: user_id.0,
            method: outcome.method().as_str().to_string(),
            result: result.to_string(),
            reason,
            timestamp: epoch_ms(),
        }
    }
}

/// Alarm payload for the alarm topic
#[derive(Debug, Clone, Serialize)]
pub struct AlarmPayload {
    /// lockout | tamper | tamper_clear | actuator
    #[serde(rename = "type")]
    pub alarm_type: String,
    pub message: String,
    pub timestamp: u64,
}

impl AlarmPayload {
    pub fn new(alarm_type: &str, message: &str) -> Self {
        Self {
            alarm_type: alarm_type.to_string(),
            message: message.to_string(),
            timestamp: epoch_ms(),
        }
    }
}

/// Device status snapshot for the status topic
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    pub device_id: String,
    /// locked | unlocked
    pub lock_state: String,
    /// open | closed
    pub door_state: String,
    /// triggered | normal
    pub tamper_state: String,
    pub timestamp: u64,
}

/// Online/offline marker published on connect and shutdown
#[derive(Debug, Clone, Serialize)]
pub struct LivenessPayload {
    pub device_id: String,
    /// online | offline
    pub status: String,
    pub timestamp: u64,
}

/// Sender handle for egress messages
///
/// Clone this to share across producers. Non-blocking - if the channel
/// is full, messages are dropped and the drop is reported to the caller.
#[derive(Clone)]
pub struct EgressSender {
    tx: mpsc::Sender<EgressMessage>,
    device_id: String,
}

impl EgressSender {
    pub fn new(tx: mpsc::Sender<EgressMessage>, device_id: String) -> Self {
        Self { tx, device_id }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Send an access record. Returns false if the channel was full.
    pub fn send_access_record(&self, payload: AccessRecordPayload) -> bool {
        self.tx.try_send(EgressMessage::AccessRecord(payload)).is_ok()
    }

    /// Send an alarm event. Returns false if the channel was full.
    pub fn send_alarm(&self, alarm_type: &str, message: &str) -> bool {
        self.tx
            .try_send(EgressMessage::Alarm(AlarmPayload::new(alarm_type, message)))
            .is_ok()
    }

    /// Send a status snapshot. Injects the device id.
    pub fn send_status(&self, lock_state: &str, door_state: &str, tamper_state: &str) -> bool {
        let payload = StatusPayload {
            device_id: self.device_id.clone(),
            lock_state: lock_state.to_string(),
            door_state: door_state.to_string(),
            tamper_state: tamper_state.to_string(),
            timestamp: epoch_ms(),
        };
        self.tx.try_send(EgressMessage::Status(payload)).is_ok()
    }

    /// Send an online/offline marker. Injects the device id.
    pub fn send_liveness(&self, status: &str) -> bool {
        let payload = LivenessPayload {
            device_id: self.device_id.clone(),
            status: status.to_string(),
            timestamp: epoch_ms(),
        };
        self.tx.try_send(EgressMessage::Liveness(payload)).is_ok()
    }
}

/// Create a new egress channel pair
///
/// Returns (sender, receiver) where the sender can be cloned and shared.
/// `device_id` is stamped into status and liveness payloads.
pub fn create_egress_channel(
    buffer_size: usize,
    device_id: String,
) -> (EgressSender, mpsc::Receiver<EgressMessage>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EgressSender::new(tx, device_id), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DenyReason, Method};

    #[test]
    fn test_record_from_granted_outcome() {
        let outcome = AccessOutcome::Granted { user_id: UserId(3), method: Method::Card };
        let record = AccessRecordPayload::from_outcome(&outcome);

        assert_eq!(record.user_id, 3);
        assert_eq!(record.method, "card");
        assert_eq!(record.result, "success");
        assert!(record.reason.is_none());
    }

    #[test]
    fn test_record_from_denied_outcome() {
        let outcome =
            AccessOutcome::Denied { method: Method::Fingerprint, reason: DenyReason::LockedOut };
        let record = AccessRecordPayload::from_outcome(&outcome);

        assert_eq!(record.user_id, 0);
        assert_eq!(record.method, "finger");
        assert_eq!(record.result, "failed");
        assert_eq!(record.reason.as_deref(), Some("locked_out"));
    }

    #[test]
    fn test_record_json_field_names() {
        let outcome = AccessOutcome::Granted { user_id: UserId(1), method: Method::Remote };
        let json = serde_json::to_string(&AccessRecordPayload::from_outcome(&outcome)).unwrap();

        // Field names are part of the wire contract
        assert!(json.contains("\"event_id\":\""));
        assert!(json.contains("\"user_id\":1"));
        assert!(json.contains("\"method\":\"remote\""));
        assert!(json.contains("\"result\":\"success\""));
        assert!(json.contains("\"timestamp\""));
        assert!(!json.contains("reason"));
    }

    #[test]
    fn test_alarm_json_uses_type_key() {
        let json = serde_json::to_string(&AlarmPayload::new("tamper", "enclosure opened")).unwrap();
        assert!(json.contains("\"type\":\"tamper\""));
        assert!(json.contains("\"message\":\"enclosure opened\""));
    }

    #[tokio::test]
    async fn test_sender_stamps_device_id() {
        let (sender, mut rx) = create_egress_channel(4, "door-01".to_string());

        assert!(sender.send_status("locked", "closed", "normal"));
        match rx.recv().await.unwrap() {
            EgressMessage::Status(s) => {
                assert_eq!(s.device_id, "door-01");
                assert_eq!(s.lock_state, "locked");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_channel_reports_drop() {
        let (sender, _rx) = create_egress_channel(1, "door-01".to_string());

        assert!(sender.send_alarm("lockout", "first"));
        assert!(!sender.send_alarm("lockout", "second"));
    }
}

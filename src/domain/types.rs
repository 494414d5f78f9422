//! Shared types for the access controller

use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Current wall-clock time as epoch milliseconds.
///
/// Used only in published payloads; decision logic runs on injected
/// monotonic `Instant`s.
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Newtype wrapper for user IDs to provide type safety
///
/// `UserId(0)` is reserved for unattributed records: remote unlocks and
/// denied attempts where no enrolled user matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UserId(pub u32);

impl UserId {
    /// Sentinel id used for remote unlocks and unmatched credentials
    pub const UNATTRIBUTED: UserId = UserId(0);
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An enrolled user and its credential bindings.
///
/// Credential fields are optional - a user may be enrolled with any
/// subset of modalities. Passwords are not required to be unique;
/// card and fingerprint ids should be unique among enabled users but
/// duplicates resolve first-match (see `UserRegistry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub enabled: bool,
}

/// Identity-verification modality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Card,
    Fingerprint,
    Password,
    Remote,
}

impl Method {
    /// Wire name for published records (matches the panel firmware vocabulary)
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Card => "card",
            Method::Fingerprint => "finger",
            Method::Password => "password",
            Method::Remote => "remote",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A presented credential, produced by a reader or the remote command
/// surface. Consumed exactly once by the decision engine.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationEvent {
    /// Card UID as a variable-length hex string, no normalization
    Card(String),
    /// Already-resolved fingerprint template id from the biometric reader
    Fingerprint(u16),
    /// Keypad password, terminated by the panel
    Password(String),
    /// Privileged remote unlock, bypasses the registry
    Remote,
}

impl VerificationEvent {
    pub fn method(&self) -> Method {
        match self {
            VerificationEvent::Card(_) => Method::Card,
            VerificationEvent::Fingerprint(_) => Method::Fingerprint,
            VerificationEvent::Password(_) => Method::Password,
            VerificationEvent::Remote => Method::Remote,
        }
    }
}

/// Why a verification attempt was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Credential not found among enabled users
    NoMatch,
    /// Rejected by the brute-force lockout policy
    LockedOut,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NoMatch => "no_match",
            DenyReason::LockedOut => "locked_out",
        }
    }
}

/// Result of a decision, handed to the audit-emission path
#[derive(Debug, Clone, PartialEq)]
pub enum AccessOutcome {
    Granted { user_id: UserId, method: Method },
    Denied { method: Method, reason: DenyReason },
}

impl AccessOutcome {
    pub fn method(&self) -> Method {
        match self {
            AccessOutcome::Granted { method, .. } => *method,
            AccessOutcome::Denied { method, .. } => *method,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted { .. })
    }
}

/// Operator command routed to this device over the command topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Remote unlock, maps to `VerificationEvent::Remote`
    OpenDoor,
    /// Status-snapshot request, no state mutation
    GetStatus,
}

/// Everything the controller task consumes, serialized through one
/// bounded channel so all state mutation happens on a single task.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// A presented credential from the panel bus
    Verification { event: VerificationEvent, received_at: Instant },
    /// Raw (undebounced) sensor report from the panel bus
    Sensors { door_open: bool, tamper: bool, received_at: Instant },
    /// Operator command from the MQTT command topic
    Command { command: RemoteCommand, received_at: Instant },
}

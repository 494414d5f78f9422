//! Domain models - core access-control types
//!
//! This module contains the canonical data types used throughout the system:
//! - `User` - an enrolled identity with its credential bindings
//! - `VerificationEvent` - a presented credential from one modality
//! - `AccessOutcome` - the result of a decision (granted or denied)
//! - `InputEvent` - everything the controller task consumes
//! - `RemoteCommand` - operator commands received over MQTT

pub mod types;

// Re-export commonly used types at module level
pub use types::{
    epoch_ms, AccessOutcome, DenyReason, InputEvent, Method, RemoteCommand, User, UserId,
    VerificationEvent,
};

//! Services - business logic and state management
//!
//! This module contains the core access-control logic:
//! - `controller` - Access decision engine and input-event orchestration
//! - `registry` - Enrolled-user table and credential resolver
//! - `lockout` - Consecutive-failure counting and timed lockout
//! - `debounce` - Minimum-dwell filtering of noisy sensor reads
//! - `tamper` - Edge-triggered tamper alarm latch
//! - `lock` - Lock actuator capability interface (queue-backed)

pub mod controller;
pub mod debounce;
pub mod lock;
pub mod lockout;
pub mod registry;
pub mod tamper;

// Re-export commonly used types
pub use controller::AccessController;
pub use lock::{create_lock_channel, ActuatorError, LockActuator, LockCmd, PanelLock};
pub use registry::UserRegistry;

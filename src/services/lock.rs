//! Lock actuator capability interface
//!
//! The decision engine never touches the serial port. It calls the
//! `LockActuator` trait, whose production implementation (`PanelLock`)
//! enqueues commands onto a bounded channel drained by the panel bus
//! task. Enqueueing is non-blocking, so a decision never waits on I/O.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// How long the strike stays released on a granted decision
pub const UNLOCK_DURATION_MS: u32 = 3000;

/// Buzzer cue: short confirmation on grant
pub const BUZZ_CONFIRM: BuzzCue = BuzzCue { duration_ms: 200, freq_hz: 1500 };
/// Buzzer cue: short, higher-pitch deny
pub const BUZZ_DENY: BuzzCue = BuzzCue { duration_ms: 500, freq_hz: 2000 };
/// Buzzer cue: lockout engaged
pub const BUZZ_LOCKOUT: BuzzCue = BuzzCue { duration_ms: 2000, freq_hz: 1000 };
/// Buzzer cue: tamper alarm
pub const BUZZ_TAMPER: BuzzCue = BuzzCue { duration_ms: 3000, freq_hz: 800 };

/// A buzzer pattern (duration + tone)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzzCue {
    pub duration_ms: u32,
    pub freq_hz: u32,
}

/// Lock actuator failure taxonomy.
///
/// Propagated upward without retry; the controller publishes an
/// `actuator` alarm so the fault is monitorable rather than fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Command queue full - the panel bus is not keeping up
    #[error("lock actuator command queue full")]
    Busy,
    /// Panel bus task gone - actuator unavailable
    #[error("lock actuator unavailable")]
    Unavailable,
}

/// Command written to the panel bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCmd {
    /// Release the strike for `duration_ms`, panel re-locks itself
    Unlock { duration_ms: u32 },
    /// Drive the buzzer
    Buzz { duration_ms: u32, freq_hz: u32 },
}

/// Capability interface consumed by the decision engine
pub trait LockActuator: Send + Sync {
    fn unlock(&self, duration_ms: u32) -> Result<(), ActuatorError>;
    fn buzz(&self, cue: BuzzCue) -> Result<(), ActuatorError>;
}

/// Production actuator: enqueues commands for the panel bus task
#[derive(Clone)]
pub struct PanelLock {
    tx: mpsc::Sender<LockCmd>,
}

impl PanelLock {
    pub fn new(tx: mpsc::Sender<LockCmd>) -> Self {
        Self { tx }
    }

    fn send(&self, cmd: LockCmd) -> Result<(), ActuatorError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => ActuatorError::Busy,
            TrySendError::Closed(_) => ActuatorError::Unavailable,
        })
    }
}

impl LockActuator for PanelLock {
    fn unlock(&self, duration_ms: u32) -> Result<(), ActuatorError> {
        self.send(LockCmd::Unlock { duration_ms })
    }

    fn buzz(&self, cue: BuzzCue) -> Result<(), ActuatorError> {
        self.send(LockCmd::Buzz { duration_ms: cue.duration_ms, freq_hz: cue.freq_hz })
    }
}

/// Create a lock command channel pair
///
/// Returns the actuator handle (for the controller) and the receiver
/// (for the panel bus task).
pub fn create_lock_channel(buffer_size: usize) -> (PanelLock, mpsc::Receiver<LockCmd>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (PanelLock::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_enqueues_command() {
        let (lock, mut rx) = create_lock_channel(4);

        lock.unlock(UNLOCK_DURATION_MS).unwrap();
        assert_eq!(rx.try_recv().unwrap(), LockCmd::Unlock { duration_ms: 3000 });
    }

    #[test]
    fn test_buzz_enqueues_command() {
        let (lock, mut rx) = create_lock_channel(4);

        lock.buzz(BUZZ_DENY).unwrap();
        assert_eq!(rx.try_recv().unwrap(), LockCmd::Buzz { duration_ms: 500, freq_hz: 2000 });
    }

    #[test]
    fn test_full_queue_reports_busy() {
        let (lock, _rx) = create_lock_channel(1);

        lock.unlock(3000).unwrap();
        assert_eq!(lock.unlock(3000), Err(ActuatorError::Busy));
    }

    #[test]
    fn test_closed_channel_reports_unavailable() {
        let (lock, rx) = create_lock_channel(1);
        drop(rx);

        assert_eq!(lock.unlock(3000), Err(ActuatorError::Unavailable));
    }
}

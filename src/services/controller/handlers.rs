//! Input-event handlers and the decision algorithm

use super::AccessController;
use crate::io::egress_channel::AccessRecordPayload;
use crate::domain::types::{
    AccessOutcome, DenyReason, InputEvent, RemoteCommand, UserId, VerificationEvent,
};
use crate::services::lock::{ActuatorError, BUZZ_CONFIRM, BUZZ_DENY, BUZZ_LOCKOUT, BUZZ_TAMPER};
use crate::services::tamper::TamperEdge;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

impl AccessController {
    /// Dispatch one input event to the appropriate handler
    pub(crate) fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Verification { event, received_at } => {
                if let Err(e) = self.decide(event, received_at) {
                    error!(error = %e, "decision_actuator_fault");
                }
            }
            InputEvent::Sensors { door_open, tamper, received_at } => {
                self.observe_sensors(door_open, tamper, received_at);
            }
            InputEvent::Command { command, received_at } => {
                self.handle_command(command, received_at);
            }
        }
    }

    /// Decide one verification attempt.
    ///
    /// Every outcome is published exactly once (record + local audit
    /// line) before this returns. The only error is an unavailable lock
    /// actuator on a would-be grant; it is propagated without retry
    /// after an `actuator` alarm is published.
    pub fn decide(
        &mut self,
        event: VerificationEvent,
        now: Instant,
    ) -> Result<AccessOutcome, ActuatorError> {
        let method = event.method();

        // Re-evaluate the time-based lockout transition first
        if self.lockout.tick(now) {
            info!("lockout_released");
        }

        // While locked out, reject without consulting the registry and
        // without advancing the failure counter
        if self.lockout.is_locked_out() {
            if let Err(e) = self.lock.buzz(BUZZ_DENY) {
                warn!(error = %e, "deny_buzz_failed");
            }
            let outcome = AccessOutcome::Denied { method, reason: DenyReason::LockedOut };
            warn!(method = %method, "verification_rejected_lockout");
            self.metrics.record_denied();
            self.emit_record(&outcome);
            return Ok(outcome);
        }

        // Remote unlock is privileged: bypasses the registry entirely
        let resolved = match &event {
            VerificationEvent::Remote => Some(UserId::UNATTRIBUTED),
            other => self.registry.resolve(other),
        };

        match resolved {
            Some(user_id) => {
                let duration_ms = self.config.unlock_duration_ms();
                if let Err(e) = self.lock.unlock(duration_ms) {
                    self.metrics.record_actuator_fault();
                    self.emit_alarm("actuator", &format!("lock actuator fault: {e}"));
                    error!(error = %e, user_id = %user_id, "unlock_failed");
                    return Err(e);
                }
                if let Err(e) = self.lock.buzz(BUZZ_CONFIRM) {
                    warn!(error = %e, "confirm_buzz_failed");
                }

                self.unlocked_until = Some(now + Duration::from_millis(u64::from(duration_ms)));
                self.lockout.record_success();
                self.metrics.record_granted();

                let outcome = AccessOutcome::Granted { user_id, method };
                info!(user_id = %user_id, method = %method, "access_granted");
                self.emit_record(&outcome);
                Ok(outcome)
            }
            None => {
                if let Err(e) = self.lock.buzz(BUZZ_DENY) {
                    warn!(error = %e, "deny_buzz_failed");
                }

                if self.lockout.record_failure(now) {
                    self.metrics.record_lockout();
                    if let Err(e) = self.lock.buzz(BUZZ_LOCKOUT) {
                        warn!(error = %e, "lockout_buzz_failed");
                    }
                    self.emit_alarm(
                        "lockout",
                        "too many failed attempts, verification locked out",
                    );
                    warn!(
                        lockout_secs = self.config.lockout_secs(),
                        "lockout_engaged"
                    );
                }
                self.metrics.record_denied();

                let outcome = AccessOutcome::Denied { method, reason: DenyReason::NoMatch };
                warn!(
                    method = %method,
                    failures = self.lockout.failures(),
                    "access_denied"
                );
                self.emit_record(&outcome);
                Ok(outcome)
            }
        }
    }

    /// Feed one raw sensor report through the debounce latches.
    ///
    /// Tamper edges raise alarms; the door state only feeds the status
    /// snapshot. Tamper never touches the lockout machine.
    pub fn observe_sensors(&mut self, door_raw: bool, tamper_raw: bool, now: Instant) {
        let prev_door = self.door.value();
        let door = self.door.poll(door_raw, now);
        if door != prev_door {
            info!(door = if door { "open" } else { "closed" }, "door_changed");
        }

        let tamper_stable = self.tamper_signal.poll(tamper_raw, now);
        match self.tamper.update(tamper_stable) {
            Some(TamperEdge::Triggered) => {
                self.metrics.record_tamper_alarm();
                if let Err(e) = self.lock.buzz(BUZZ_TAMPER) {
                    warn!(error = %e, "tamper_buzz_failed");
                }
                self.emit_alarm("tamper", "tamper sensor triggered, possible enclosure breach");
                warn!("tamper_triggered");
            }
            Some(TamperEdge::Cleared) => {
                self.emit_alarm("tamper_clear", "tamper condition cleared");
                info!("tamper_cleared");
            }
            None => {}
        }
    }

    /// Handle one routed operator command
    pub(crate) fn handle_command(&mut self, command: RemoteCommand, now: Instant) {
        self.metrics.record_command();
        match command {
            RemoteCommand::OpenDoor => {
                info!("remote_open_requested");
                if let Err(e) = self.decide(VerificationEvent::Remote, now) {
                    error!(error = %e, "remote_open_failed");
                }
            }
            RemoteCommand::GetStatus => {
                self.publish_status(now);
            }
        }
    }

    /// Periodic security re-evaluation (1 s cadence)
    pub(crate) fn security_cycle(&mut self, now: Instant) {
        if self.lockout.tick(now) {
            info!("lockout_released");
        }
        // Relock bookkeeping - the panel re-locks itself, this only
        // keeps the reported lock_state honest
        if matches!(self.unlocked_until, Some(until) if now >= until) {
            self.unlocked_until = None;
        }
    }

    /// Publish the status snapshot (no state mutation beyond egress)
    pub(crate) fn publish_status(&mut self, now: Instant) {
        let lock_state = if self.is_unlocked(now) { "unlocked" } else { "locked" };
        let door_state = if self.door.value() { "open" } else { "closed" };
        let tamper_state = if self.tamper.is_active() { "triggered" } else { "normal" };

        if !self.egress.send_status(lock_state, door_state, tamper_state) {
            self.metrics.record_egress_dropped();
            warn!("status_egress_dropped");
        }
    }

    /// Whether the strike is within its release window
    pub fn is_unlocked(&self, now: Instant) -> bool {
        matches!(self.unlocked_until, Some(until) if now < until)
    }

    /// Append the audit line and publish the record, once per decision
    fn emit_record(&mut self, outcome: &AccessOutcome) {
        let record = AccessRecordPayload::from_outcome(outcome);
        self.audit.append(&record);
        if !self.egress.send_access_record(record) {
            self.metrics.record_egress_dropped();
            warn!("record_egress_dropped");
        }
    }

    fn emit_alarm(&mut self, alarm_type: &str, message: &str) {
        if !self.egress.send_alarm(alarm_type, message) {
            self.metrics.record_egress_dropped();
            warn!(alarm_type = alarm_type, "alarm_egress_dropped");
        }
    }
}

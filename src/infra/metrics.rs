//! Lock-free decision and alarm counters
//!
//! Uses atomics so hot-path updates never contend. These are
//! statistical counters only - never use them for logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct Metrics {
    decisions_total: AtomicU64,
    granted_total: AtomicU64,
    denied_total: AtomicU64,
    lockouts_total: AtomicU64,
    tamper_alarms_total: AtomicU64,
    commands_total: AtomicU64,
    actuator_faults_total: AtomicU64,
    egress_dropped_total: AtomicU64,
    input_dropped_total: AtomicU64,
    started: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            decisions_total: AtomicU64::new(0),
            granted_total: AtomicU64::new(0),
            denied_total: AtomicU64::new(0),
            lockouts_total: AtomicU64::new(0),
            tamper_alarms_total: AtomicU64::new(0),
            commands_total: AtomicU64::new(0),
            actuator_faults_total: AtomicU64::new(0),
            egress_dropped_total: AtomicU64::new(0),
            input_dropped_total: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_granted(&self) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);
        self.granted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);
        self.denied_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lockout(&self) {
        self.lockouts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tamper_alarm(&self) {
        self.tamper_alarms_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_actuator_fault(&self) {
        self.actuator_faults_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_egress_dropped(&self) {
        self.egress_dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_input_dropped(&self) {
        self.input_dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decisions_total(&self) -> u64 {
        self.decisions_total.load(Ordering::Relaxed)
    }

    pub fn granted_total(&self) -> u64 {
        self.granted_total.load(Ordering::Relaxed)
    }

    pub fn denied_total(&self) -> u64 {
        self.denied_total.load(Ordering::Relaxed)
    }

    pub fn lockouts_total(&self) -> u64 {
        self.lockouts_total.load(Ordering::Relaxed)
    }

    /// Log a periodic summary
    pub fn report(&self) {
        info!(
            uptime_secs = self.started.elapsed().as_secs(),
            decisions = self.decisions_total.load(Ordering::Relaxed),
            granted = self.granted_total.load(Ordering::Relaxed),
            denied = self.denied_total.load(Ordering::Relaxed),
            lockouts = self.lockouts_total.load(Ordering::Relaxed),
            tamper_alarms = self.tamper_alarms_total.load(Ordering::Relaxed),
            commands = self.commands_total.load(Ordering::Relaxed),
            actuator_faults = self.actuator_faults_total.load(Ordering::Relaxed),
            egress_dropped = self.egress_dropped_total.load(Ordering::Relaxed),
            input_dropped = self.input_dropped_total.load(Ordering::Relaxed),
            "metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_counters() {
        let metrics = Metrics::new();

        metrics.record_granted();
        metrics.record_denied();
        metrics.record_denied();

        assert_eq!(metrics.decisions_total(), 3);
        assert_eq!(metrics.granted_total(), 1);
        assert_eq!(metrics.denied_total(), 2);
    }

    #[test]
    fn test_lockout_counter() {
        let metrics = Metrics::new();
        metrics.record_lockout();
        assert_eq!(metrics.lockouts_total(), 1);
    }
}

//! Access decision engine and input-event orchestration
//!
//! The controller is the single owner of all security state: the user
//! registry, the lockout machine, the debounced door/tamper latches and
//! the lock-release window. It consumes every input through one bounded
//! channel, so all mutation happens on this task - the one
//! mutual-exclusion boundary the design requires.

mod handlers;

use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::audit_log::AuditLog;
use crate::io::egress_channel::EgressSender;
use crate::io::users_store::UsersStore;
use crate::domain::types::{InputEvent, UserId};
use crate::services::debounce::DebouncedSignal;
use crate::services::lock::LockActuator;
use crate::services::lockout::LockoutPolicy;
use crate::services::registry::UserRegistry;
use crate::services::tamper::TamperLatch;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::info;

/// Central decision engine for the access controller
pub struct AccessController {
    /// Enrolled users and credential resolver
    pub(crate) registry: UserRegistry,
    /// Brute-force lockout machine
    pub(crate) lockout: LockoutPolicy,
    /// Debounced door-contact latch
    pub(crate) door: DebouncedSignal,
    /// Debounced tamper-contact latch
    pub(crate) tamper_signal: DebouncedSignal,
    /// Edge-triggered tamper alarm
    pub(crate) tamper: TamperLatch,
    /// Lock actuator capability (queue-backed, non-blocking)
    pub(crate) lock: Arc<dyn LockActuator>,
    /// Publish sink for records, alarms and status
    pub(crate) egress: EgressSender,
    /// Local append-only access log
    pub(crate) audit: AuditLog,
    /// Registry provider for persist-on-change (optional)
    pub(crate) users_store: Option<UsersStore>,
    /// Application configuration
    pub(crate) config: Config,
    /// Decision/alarm counters
    pub(crate) metrics: Arc<Metrics>,
    /// Strike release window; `None` when locked
    pub(crate) unlocked_until: Option<Instant>,
}

impl AccessController {
    /// Create a new controller with the given configuration and collaborators
    pub fn new(
        config: Config,
        registry: UserRegistry,
        lock: Arc<dyn LockActuator>,
        egress: EgressSender,
        metrics: Arc<Metrics>,
    ) -> Self {
        let audit = AuditLog::new(config.audit_file());
        let debounce = Duration::from_millis(config.debounce_ms());
        let lockout = LockoutPolicy::with_limits(
            config.max_failed_attempts(),
            Duration::from_secs(config.lockout_secs()),
        );
        registry.warn_duplicates();
        Self {
            registry,
            lockout,
            door: DebouncedSignal::with_window(false, debounce),
            tamper_signal: DebouncedSignal::with_window(false, debounce),
            tamper: TamperLatch::new(false),
            lock,
            egress,
            audit,
            users_store: None,
            config,
            metrics,
            unlocked_until: None,
        }
    }

    /// Attach a users store so enable/disable changes persist
    pub fn with_users_store(mut self, store: UsersStore) -> Self {
        self.users_store = Some(store);
        self
    }

    /// Enable or disable an enrolled user. Returns false for unknown ids.
    ///
    /// Persists the table when `users.persist_changes` is set.
    pub fn set_enabled(&mut self, user_id: UserId, enabled: bool) -> bool {
        if !self.registry.set_enabled(user_id, enabled) {
            return false;
        }
        info!(user_id = %user_id, enabled = enabled, "user_enabled_changed");

        if self.config.users_persist_changes() {
            if let Some(ref store) = self.users_store {
                if let Err(e) = store.save(self.registry.users()) {
                    tracing::error!(error = %e, "users_persist_failed");
                }
            }
        }
        true
    }

    /// Start the controller, consuming events from the channel.
    ///
    /// A 1 s tick drives the security cycle (lockout expiry, relock
    /// bookkeeping) and the periodic status snapshot.
    pub async fn run(&mut self, mut event_rx: mpsc::Receiver<InputEvent>) {
        info!(
            users = self.registry.len(),
            max_failed_attempts = self.config.max_failed_attempts(),
            lockout_secs = self.config.lockout_secs(),
            "controller_started"
        );

        let mut tick = interval(Duration::from_secs(1));
        let mut ticks_since_status = 0u64;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(e) => self.handle_event(e),
                        None => break, // Channel closed
                    }
                }
                _ = tick.tick() => {
                    let now = Instant::now();
                    self.security_cycle(now);

                    ticks_since_status += 1;
                    if ticks_since_status >= self.config.status_interval_secs() {
                        ticks_since_status = 0;
                        self.publish_status(now);
                    }
                }
            }
        }

        info!("controller_stopped");
    }
}

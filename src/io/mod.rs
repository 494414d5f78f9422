//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `panel` - Serial front-panel bus (credential events, sensor reports,
//!   lock/buzzer commands)
//! - `egress_channel` - Typed channel for MQTT egress messages
//! - `mqtt_egress` - MQTT publisher for records, alarms and status
//! - `mqtt_command` - MQTT subscriber for remote operator commands
//! - `audit_log` - Append-only JSONL access log on local storage
//! - `users_store` - JSON-file registry provider (load at boot,
//!   optional persist-on-change)

pub mod audit_log;
pub mod egress_channel;
pub mod mqtt_command;
pub mod mqtt_egress;
pub mod panel;
pub mod users_store;

// Re-export commonly used types
pub use audit_log::AuditLog;
pub use egress_channel::{
    create_egress_channel, AccessRecordPayload, AlarmPayload, EgressMessage, EgressSender,
    StatusPayload,
};
pub use mqtt_command::start_command_listener;
pub use mqtt_egress::MqttPublisher;
pub use panel::PanelMonitor;
pub use users_store::UsersStore;

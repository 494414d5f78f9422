//! Configuration loading from TOML files
//!
//! The config file path comes from the binary's `--config` argument
//! (default: config/dev.toml).

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier, used for command routing and status
    #[serde(default = "default_device_id")]
    pub id: String,
}

// Manual Default impls everywhere below: a derived Default would
// zero/empty the fields when a whole section is omitted, because
// serde's container-level `default` uses Default::default(), not the
// field-level default functions.
impl Default for DeviceConfig {
    fn default() -> Self {
        Self { id: default_device_id() }
    }
}

fn default_device_id() -> String {
    "access-ctl-001".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicsConfig {
    #[serde(default = "default_status_topic")]
    pub status: String,
    #[serde(default = "default_record_topic")]
    pub record: String,
    #[serde(default = "default_alarm_topic")]
    pub alarm: String,
    #[serde(default = "default_command_topic")]
    pub command: String,
}

fn default_status_topic() -> String {
    "access-control/status".to_string()
}

fn default_record_topic() -> String {
    "access-control/record".to_string()
}

fn default_alarm_topic() -> String {
    "access-control/alarm".to_string()
}

fn default_command_topic() -> String {
    "access-control/command".to_string()
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            status: default_status_topic(),
            record: default_record_topic(),
            alarm: default_alarm_topic(),
            command: default_command_topic(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    pub device: String,
    pub baud: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Consecutive failures that engage the lockout
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// Lockout hold time in seconds
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,
    /// Strike release time on grant, milliseconds
    #[serde(default = "default_unlock_duration_ms")]
    pub unlock_duration_ms: u32,
    /// Sensor debounce window, milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    60
}

fn default_unlock_duration_ms() -> u32 {
    3000
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            lockout_secs: default_lockout_secs(),
            unlock_duration_ms: default_unlock_duration_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersConfig {
    /// Path to the enrolled-user JSON file
    #[serde(default = "default_users_file")]
    pub file: String,
    /// Write enable/disable changes back to the file
    #[serde(default)]
    pub persist_changes: bool,
}

fn default_users_file() -> String {
    "config/users.json".to_string()
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self { file: default_users_file(), persist_changes: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Local append-only access log (JSONL)
    #[serde(default = "default_audit_file")]
    pub file: String,
}

fn default_audit_file() -> String {
    "access-log.jsonl".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { file: default_audit_file() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Interval between periodic status snapshots, seconds
    #[serde(default = "default_status_interval")]
    pub interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { interval_secs: default_status_interval() }
    }
}

fn default_status_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

fn default_broker_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { bind_address: default_broker_bind_address(), port: default_broker_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub topics: TopicsConfig,
    pub panel: PanelConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    device_id: String,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    status_topic: String,
    record_topic: String,
    alarm_topic: String,
    command_topic: String,
    panel_device: String,
    panel_baud: u32,
    max_failed_attempts: u32,
    lockout_secs: u64,
    unlock_duration_ms: u32,
    debounce_ms: u64,
    users_file: String,
    users_persist_changes: bool,
    audit_file: String,
    status_interval_secs: u64,
    broker_bind_address: String,
    broker_port: u16,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_username: None,
            mqtt_password: None,
            status_topic: default_status_topic(),
            record_topic: default_record_topic(),
            alarm_topic: default_alarm_topic(),
            command_topic: default_command_topic(),
            panel_device: "/dev/ttyAMA0".to_string(),
            panel_baud: 115200,
            max_failed_attempts: default_max_failed_attempts(),
            lockout_secs: default_lockout_secs(),
            unlock_duration_ms: default_unlock_duration_ms(),
            debounce_ms: default_debounce_ms(),
            users_file: default_users_file(),
            users_persist_changes: false,
            audit_file: default_audit_file(),
            status_interval_secs: default_status_interval(),
            broker_bind_address: default_broker_bind_address(),
            broker_port: default_broker_port(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            device_id: toml_config.device.id,
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            status_topic: toml_config.topics.status,
            record_topic: toml_config.topics.record,
            alarm_topic: toml_config.topics.alarm,
            command_topic: toml_config.topics.command,
            panel_device: toml_config.panel.device,
            panel_baud: toml_config.panel.baud,
            max_failed_attempts: toml_config.security.max_failed_attempts,
            lockout_secs: toml_config.security.lockout_secs,
            unlock_duration_ms: toml_config.security.unlock_duration_ms,
            debounce_ms: toml_config.security.debounce_ms,
            users_file: toml_config.users.file,
            users_persist_changes: toml_config.users.persist_changes,
            audit_file: toml_config.audit.file,
            status_interval_secs: toml_config.status.interval_secs,
            broker_bind_address: toml_config.broker.bind_address,
            broker_port: toml_config.broker.port,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn status_topic(&self) -> &str {
        &self.status_topic
    }

    pub fn record_topic(&self) -> &str {
        &self.record_topic
    }

    pub fn alarm_topic(&self) -> &str {
        &self.alarm_topic
    }

    pub fn command_topic(&self) -> &str {
        &self.command_topic
    }

    pub fn panel_device(&self) -> &str {
        &self.panel_device
    }

    pub fn panel_baud(&self) -> u32 {
        self.panel_baud
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn lockout_secs(&self) -> u64 {
        self.lockout_secs
    }

    pub fn unlock_duration_ms(&self) -> u32 {
        self.unlock_duration_ms
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    pub fn users_file(&self) -> &str {
        &self.users_file
    }

    pub fn users_persist_changes(&self) -> bool {
        self.users_persist_changes
    }

    pub fn audit_file(&self) -> &str {
        &self.audit_file
    }

    pub fn status_interval_secs(&self) -> u64 {
        self.status_interval_secs
    }

    pub fn broker_bind_address(&self) -> &str {
        &self.broker_bind_address
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to shrink the lockout window
    #[cfg(test)]
    pub fn with_lockout(mut self, max_failed_attempts: u32, lockout_secs: u64) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self.lockout_secs = lockout_secs;
        self
    }

    /// Builder method for tests to redirect the audit file
    #[cfg(test)]
    pub fn with_audit_file(mut self, path: &str) -> Self {
        self.audit_file = path.to_string();
        self
    }

    /// Builder method for tests to enable persist-on-change
    #[cfg(test)]
    pub fn with_users_persistence(mut self, file: &str) -> Self {
        self.users_file = file.to_string();
        self.users_persist_changes = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device_id(), "access-ctl-001");
        assert_eq!(config.mqtt_host(), "localhost");
        assert_eq!(config.mqtt_port(), 1883);
        assert_eq!(config.status_topic(), "access-control/status");
        assert_eq!(config.record_topic(), "access-control/record");
        assert_eq!(config.alarm_topic(), "access-control/alarm");
        assert_eq!(config.command_topic(), "access-control/command");
        assert_eq!(config.max_failed_attempts(), 5);
        assert_eq!(config.lockout_secs(), 60);
        assert_eq!(config.unlock_duration_ms(), 3000);
        assert_eq!(config.debounce_ms(), 50);
        assert_eq!(config.status_interval_secs(), 30);
    }

    #[test]
    fn test_omitted_sections_use_field_defaults() {
        // Only the required sections; the optional ones must come back
        // with their documented defaults, not zeroed structs
        let content = r#"
[mqtt]
host = "localhost"
port = 1883

[panel]
device = "/dev/ttyAMA0"
baud = 115200
"#;
        let parsed: TomlConfig = toml::from_str(content).unwrap();

        assert_eq!(parsed.device.id, "access-ctl-001");
        assert_eq!(parsed.topics.status, "access-control/status");
        assert_eq!(parsed.topics.record, "access-control/record");
        assert_eq!(parsed.security.max_failed_attempts, 5);
        assert_eq!(parsed.security.lockout_secs, 60);
        assert_eq!(parsed.security.unlock_duration_ms, 3000);
        assert_eq!(parsed.security.debounce_ms, 50);
        assert_eq!(parsed.users.file, "config/users.json");
        assert!(!parsed.users.persist_changes);
        assert_eq!(parsed.audit.file, "access-log.jsonl");
        assert_eq!(parsed.status.interval_secs, 30);
        assert_eq!(parsed.broker.port, 1883);
    }

    #[test]
    fn test_load_from_path_fallback() {
        let config = Config::load_from_path("/nonexistent/config.toml");
        assert_eq!(config.mqtt_host(), "localhost");
        assert_eq!(config.max_failed_attempts(), 5);
    }
}

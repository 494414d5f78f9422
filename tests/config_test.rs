//! Integration tests for configuration loading

use doorguard::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[device]
id = "test-door"

[mqtt]
host = "test-host"
port = 1884
username = "door"
password = "secret"

[topics]
status = "test/status"
record = "test/record"
alarm = "test/alarm"
command = "test/command"

[panel]
device = "/dev/test"
baud = 9600

[security]
max_failed_attempts = 3
lockout_secs = 120
unlock_duration_ms = 5000
debounce_ms = 30

[users]
file = "/etc/doorguard/users.json"
persist_changes = true

[audit]
file = "/var/log/doorguard/access-log.jsonl"

[status]
interval_secs = 10

[broker]
bind_address = "127.0.0.1"
port = 1884
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.device_id(), "test-door");
    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_username(), Some("door"));
    assert_eq!(config.status_topic(), "test/status");
    assert_eq!(config.record_topic(), "test/record");
    assert_eq!(config.alarm_topic(), "test/alarm");
    assert_eq!(config.command_topic(), "test/command");
    assert_eq!(config.panel_device(), "/dev/test");
    assert_eq!(config.panel_baud(), 9600);
    assert_eq!(config.max_failed_attempts(), 3);
    assert_eq!(config.lockout_secs(), 120);
    assert_eq!(config.unlock_duration_ms(), 5000);
    assert_eq!(config.debounce_ms(), 30);
    assert_eq!(config.users_file(), "/etc/doorguard/users.json");
    assert!(config.users_persist_changes());
    assert_eq!(config.audit_file(), "/var/log/doorguard/access-log.jsonl");
    assert_eq!(config.status_interval_secs(), 10);
    assert_eq!(config.broker_bind_address(), "127.0.0.1");
    assert_eq!(config.broker_port(), 1884);
}

#[test]
fn test_sections_default_when_omitted() {
    let mut temp_file = NamedTempFile::new().unwrap();

    // Only the required sections; everything else falls to defaults
    let config_content = r#"
[mqtt]
host = "localhost"
port = 1883

[panel]
device = "/dev/ttyAMA0"
baud = 115200
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.device_id(), "access-ctl-001");
    assert_eq!(config.status_topic(), "access-control/status");
    assert_eq!(config.max_failed_attempts(), 5);
    assert_eq!(config.lockout_secs(), 60);
    assert_eq!(config.unlock_duration_ms(), 3000);
    assert_eq!(config.debounce_ms(), 50);
    assert!(!config.users_persist_changes());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.max_failed_attempts(), 5);
}

//! Append-only access log on local storage
//!
//! Every decision is appended as one JSON object per line, independent
//! of MQTT delivery, so the device keeps a local audit trail across
//! network outages.

use crate::io::egress_channel::AccessRecordPayload;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// JSONL audit log writer
pub struct AuditLog {
    file_path: String,
}

impl AuditLog {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "audit_log_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Append one access record. Returns true on success.
    ///
    /// A write failure is logged, never fatal - local storage loss must
    /// not block decisions.
    pub fn append(&self, record: &AccessRecordPayload) -> bool {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "audit_serialize_failed");
                return false;
            }
        };

        match self.append_line(&json) {
            Ok(()) => {
                debug!(
                    user_id = record.user_id,
                    method = %record.method,
                    result = %record.result,
                    "audit_appended"
                );
                true
            }
            Err(e) => {
                error!(error = %e, file = %self.file_path, "audit_append_failed");
                false
            }
        }
    }

    /// Append a line to the log file, creating parent directories
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccessOutcome, Method, UserId};
    use std::fs;
    use tempfile::tempdir;

    fn sample_record() -> AccessRecordPayload {
        AccessRecordPayload::from_outcome(&AccessOutcome::Granted {
            user_id: UserId(1),
            method: Method::Card,
        })
    }

    #[test]
    fn test_append_creates_file_and_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("access.jsonl");
        let log = AuditLog::new(path.to_str().unwrap());

        assert!(log.append(&sample_record()));
        assert!(log.append(&sample_record()));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"result\":\"success\""));
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/access.jsonl");
        let log = AuditLog::new(path.to_str().unwrap());

        assert!(log.append(&sample_record()));
        assert!(path.exists());
    }

    #[test]
    fn test_lines_are_valid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("access.jsonl");
        let log = AuditLog::new(path.to_str().unwrap());
        log.append(&sample_record());

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["user_id"], 1);
        assert_eq!(parsed["method"], "card");
    }
}

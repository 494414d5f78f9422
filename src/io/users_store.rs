//! JSON-file registry provider
//!
//! Loads the enrolled-user table at boot and optionally persists
//! enable/disable changes back. Provisioning (creating and deleting
//! users) happens outside the device; this store only reads what the
//! provisioning side wrote.

use crate::domain::types::User;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File-backed user table
pub struct UsersStore {
    path: PathBuf,
}

impl UsersStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the user table from the JSON file
    pub fn load(&self) -> anyhow::Result<Vec<User>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read users file {}", self.path.display()))?;

        let users: Vec<User> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse users file {}", self.path.display()))?;

        info!(count = users.len(), file = %self.path.display(), "users_loaded");
        Ok(users)
    }

    /// Persist the user table (used when persist_changes is enabled)
    pub fn save(&self, users: &[User]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create users directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(users).context("Failed to serialize users")?;

        // Write to a sibling temp file and rename so a crash mid-write
        // never leaves a truncated user table behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write users file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!("Failed to replace users file {}", self.path.display())
        })?;

        info!(count = users.len(), file = %self.path.display(), "users_saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UserId;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"[
        {"id": 1, "name": "Admin", "card_id": "12345678", "fingerprint_id": 1, "password": "123456", "enabled": true},
        {"id": 2, "name": "Visitor", "card_id": "87654321", "enabled": false}
    ]"#;

    #[test]
    fn test_load_users() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let users = UsersStore::new(&path).load().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, UserId(1));
        assert_eq!(users[0].card_id.as_deref(), Some("12345678"));
        // Missing credential fields default to None
        assert_eq!(users[1].fingerprint_id, None);
        assert!(!users[1].enabled);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let store = UsersStore::new("/nonexistent/users.json");
        assert!(store.load().is_err());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/users.json");
        let store = UsersStore::new(&path);

        let mut users: Vec<User> = serde_json::from_str(SAMPLE).unwrap();
        users[1].enabled = true;
        store.save(&users).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded[1].enabled);
    }

    #[test]
    fn test_save_replaces_file_without_leftover_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        let store = UsersStore::new(&path);

        let mut users: Vec<User> = serde_json::from_str(SAMPLE).unwrap();
        store.save(&users).unwrap();

        // Overwrite with a change; the temp file must not linger
        users[0].enabled = false;
        store.save(&users).unwrap();

        assert!(!dir.path().join("users.json.tmp").exists());
        let reloaded = store.load().unwrap();
        assert!(!reloaded[0].enabled);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(UsersStore::new(&path).load().is_err());
    }
}

//! Enrolled-user registry and credential resolver
//!
//! Lookups scan enabled users in registry order and return the first
//! match. The registry is small (tens of entries on this hardware class)
//! so a linear scan is the deliberate design; first-match ordering is an
//! observable contract and must not be replaced with a hash index.

use crate::domain::types::{User, UserId, VerificationEvent};
use tracing::warn;

/// In-memory table of enrolled users
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: Vec<User>,
}

impl UserRegistry {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    /// Number of enrolled users (enabled or not)
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Find the first enabled user bound to this card id.
    /// Comparison is exact - no case folding, no leading-zero trimming.
    pub fn find_by_card(&self, card_id: &str) -> Option<UserId> {
        self.users
            .iter()
            .find(|u| u.enabled && u.card_id.as_deref() == Some(card_id))
            .map(|u| u.id)
    }

    /// Find the first enabled user bound to this fingerprint template id
    pub fn find_by_fingerprint(&self, template_id: u16) -> Option<UserId> {
        self.users
            .iter()
            .find(|u| u.enabled && u.fingerprint_id == Some(template_id))
            .map(|u| u.id)
    }

    /// Find the first enabled user with this password.
    /// Passwords are not unique; first match wins.
    pub fn find_by_password(&self, password: &str) -> Option<UserId> {
        self.users
            .iter()
            .find(|u| u.enabled && u.password.as_deref() == Some(password))
            .map(|u| u.id)
    }

    /// Resolve a credential event to an enrolled user.
    ///
    /// `Remote` is not resolvable here - the decision engine grants it
    /// without consulting the registry.
    pub fn resolve(&self, event: &VerificationEvent) -> Option<UserId> {
        match event {
            VerificationEvent::Card(id) => self.find_by_card(id),
            VerificationEvent::Fingerprint(id) => self.find_by_fingerprint(*id),
            VerificationEvent::Password(pw) => self.find_by_password(pw),
            VerificationEvent::Remote => None,
        }
    }

    /// Enable or disable a user. Returns false if the id is unknown.
    pub fn set_enabled(&mut self, user_id: UserId, enabled: bool) -> bool {
        match self.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Log duplicate card / fingerprint bindings among enabled users.
    ///
    /// Duplicates are permitted and resolve first-match; this only makes
    /// a provisioning mistake visible at boot.
    pub fn warn_duplicates(&self) {
        let enabled: Vec<&User> = self.users.iter().filter(|u| u.enabled).collect();
        for (i, a) in enabled.iter().enumerate() {
            for b in &enabled[i + 1..] {
                if a.card_id.is_some() && a.card_id == b.card_id {
                    warn!(
                        card_id = %a.card_id.as_deref().unwrap_or(""),
                        first_user = %a.id,
                        shadowed_user = %b.id,
                        "registry_duplicate_card"
                    );
                }
                if a.fingerprint_id.is_some() && a.fingerprint_id == b.fingerprint_id {
                    warn!(
                        template_id = a.fingerprint_id.unwrap_or(0),
                        first_user = %a.id,
                        shadowed_user = %b.id,
                        "registry_duplicate_fingerprint"
                    );
                }
            }
        }
    }
}

//! Role-keyed persistence for captured session state
//!
//! One slot per role, stored at `<state_dir>/<role>.json`. The blob inside a
//! slot is opaque: it is whatever the browser layer serialized (cookies plus
//! storage origins) and is written back verbatim, so the browser layer can
//! point at the slot path directly when seeding a context. Slots follow
//! single-writer/multiple-reader discipline: only the provisioning phase
//! writes, and it completes before any consumer reads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::role::Role;

/// Opaque serialized browsing-context state for one role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState(serde_json::Value);

impl SessionState {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self(serde_json::from_str(raw)?))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Keyed store of session-state slots
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the role's slot, whether or not it exists
    pub fn slot_path(&self, role: Role) -> PathBuf {
        self.dir.join(role.slot_name())
    }

    /// Persist state for a role, overwriting any previous slot
    pub fn save(&self, role: Role, state: &SessionState) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(role);
        let blob = serde_json::to_string_pretty(state)?;
        std::fs::write(&path, blob)?;
        info!("session state for {} saved to {}", role, path.display());
        Ok(path)
    }

    /// Load a role's state, or `MissingSessionState` if never provisioned
    pub fn load(&self, role: Role) -> Result<SessionState> {
        let path = self.slot_path(role);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingSessionState { role });
            }
            Err(e) => return Err(e.into()),
        };
        SessionState::parse(&raw)
    }

    pub fn exists(&self, role: Role) -> bool {
        self.slot_path(role).is_file()
    }

    /// Remove a role's slot. Removing an absent slot is a no-op.
    pub fn invalidate(&self, role: Role) -> Result<()> {
        let path = self.slot_path(role);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("invalidated session state for {}", role);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reset every role's slot
    pub fn invalidate_all(&self) -> Result<()> {
        for role in Role::ALL {
            self.invalidate(role)?;
        }
        Ok(())
    }

    /// Roles with a slot currently present
    pub fn provisioned(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| self.exists(*r)).collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(marker: &str) -> SessionState {
        SessionState::new(json!({
            "cookies": [{ "name": "session", "value": marker }],
            "origins": [],
        }))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        store.save(Role::Admin, &state("abc")).unwrap();
        let loaded = store.load(Role::Admin).unwrap();
        assert_eq!(loaded.as_value()["cookies"][0]["value"], "abc");
    }

    #[test]
    fn load_without_provisioning_fails_with_missing_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        match store.load(Role::Vendor) {
            Err(Error::MissingSessionState { role }) => assert_eq!(role, Role::Vendor),
            other => panic!("expected MissingSessionState, got {:?}", other),
        }
    }

    #[test]
    fn save_overwrites_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        store.save(Role::Admin, &state("first")).unwrap();
        store.save(Role::Admin, &state("second")).unwrap();

        let loaded = store.load(Role::Admin).unwrap();
        assert_eq!(loaded.as_value()["cookies"][0]["value"], "second");
        // Exactly one slot for the role
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn slots_are_isolated_per_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        store.save(Role::Admin, &state("admin")).unwrap();
        assert!(store.exists(Role::Admin));
        assert!(!store.exists(Role::Vendor));
        assert_eq!(store.provisioned(), vec![Role::Admin]);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        store.save(Role::Customer, &state("x")).unwrap();
        store.invalidate(Role::Customer).unwrap();
        assert!(!store.exists(Role::Customer));
        // Second reset of an already-empty slot is a no-op
        store.invalidate(Role::Customer).unwrap();
    }

    #[test]
    fn invalidate_all_clears_every_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        for role in Role::ALL {
            store.save(role, &state(role.as_str())).unwrap();
        }
        store.invalidate_all().unwrap();
        assert!(store.provisioned().is_empty());
    }

    #[test]
    fn corrupted_slot_is_a_json_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(store.slot_path(Role::Vendor), "not json {").unwrap();

        assert!(matches!(store.load(Role::Vendor), Err(Error::Json(_))));
    }
}

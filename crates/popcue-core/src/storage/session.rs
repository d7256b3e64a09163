//! Session-scoped trigger persistence.
//!
//! One string value per logical key:
//!
//! ```text
//! {prefix}.tracking.welcome     JSON TrackingState
//! {prefix}.tracking.urgency     JSON TrackingState
//! {prefix}.tracking.exit        JSON TrackingState
//! {prefix}.countdown.remaining  integer seconds
//! {prefix}.countdown.active     "true" | "false"
//! {prefix}.saved_at             epoch milliseconds
//! ```
//!
//! A snapshot without `saved_at` counts as absent. Any value that fails to
//! parse makes the whole load fail with [`RestoreError`]; the engine then falls
//! back to fresh defaults.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{RestoreError, StoreError};
use crate::timer::CountdownSnapshot;
use crate::trigger::{PopupKind, TrackingByKind, TrackingState};

/// Key-value string store scoped to the browsing session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store. Clones share the same map, so two engines built on clones
/// of one store behave like two page loads in one browser session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// Fully qualified key names for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    prefix: String,
}

impl SessionKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn tracking(&self, kind: PopupKind) -> String {
        format!("{}.tracking.{}", self.prefix, kind.as_str())
    }

    pub fn countdown_remaining(&self) -> String {
        format!("{}.countdown.remaining", self.prefix)
    }

    pub fn countdown_active(&self) -> String {
        format!("{}.countdown.active", self.prefix)
    }

    pub fn saved_at(&self) -> String {
        format!("{}.saved_at", self.prefix)
    }

    pub fn all(&self) -> Vec<String> {
        let mut keys: Vec<String> = PopupKind::ALL.iter().map(|k| self.tracking(*k)).collect();
        keys.push(self.countdown_remaining());
        keys.push(self.countdown_active());
        keys.push(self.saved_at());
        keys
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self::new("popcue")
    }
}

/// Everything needed to resume a page within the same day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tracking: TrackingByKind,
    pub countdown: CountdownSnapshot,
    pub saved_at_ms: i64,
}

fn corrupt(key: &str, message: impl ToString) -> RestoreError {
    RestoreError::Corrupt {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Read the snapshot back. Missing tracking or countdown keys fall back to
/// defaults; a missing `saved_at` means there is nothing to restore.
pub fn load_snapshot(
    store: &dyn SessionStore,
    keys: &SessionKeys,
    default_countdown_secs: u32,
) -> Result<Option<SessionSnapshot>, RestoreError> {
    let saved_at_key = keys.saved_at();
    let Some(raw_saved_at) = store.get(&saved_at_key)? else {
        return Ok(None);
    };
    let saved_at_ms: i64 = raw_saved_at
        .trim()
        .parse()
        .map_err(|e| corrupt(&saved_at_key, e))?;

    let mut tracking = TrackingByKind::default();
    for kind in PopupKind::ALL {
        let key = keys.tracking(kind);
        if let Some(raw) = store.get(&key)? {
            let state: TrackingState = serde_json::from_str(&raw).map_err(|e| corrupt(&key, e))?;
            *tracking.get_mut(kind) = state;
        }
    }

    let remaining_key = keys.countdown_remaining();
    let remaining_secs = match store.get(&remaining_key)? {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|e| corrupt(&remaining_key, e))?,
        None => default_countdown_secs,
    };

    let active_key = keys.countdown_active();
    let is_active = match store.get(&active_key)? {
        Some(raw) => raw
            .trim()
            .parse::<bool>()
            .map_err(|e| corrupt(&active_key, e))?,
        None => false,
    };

    Ok(Some(SessionSnapshot {
        tracking,
        countdown: CountdownSnapshot {
            remaining_secs,
            is_active,
        },
        saved_at_ms,
    }))
}

/// Write the full snapshot.
pub fn save_snapshot(
    store: &mut dyn SessionStore,
    keys: &SessionKeys,
    snapshot: &SessionSnapshot,
) -> Result<(), StoreError> {
    for kind in PopupKind::ALL {
        let json = serde_json::to_string(snapshot.tracking.get(kind))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        store.set(&keys.tracking(kind), &json)?;
    }
    save_countdown(store, keys, snapshot.countdown, snapshot.saved_at_ms)
}

/// Write only the countdown keys and the save time; used on every countdown tick.
pub fn save_countdown(
    store: &mut dyn SessionStore,
    keys: &SessionKeys,
    countdown: CountdownSnapshot,
    saved_at_ms: i64,
) -> Result<(), StoreError> {
    store.set(
        &keys.countdown_remaining(),
        &countdown.remaining_secs.to_string(),
    )?;
    store.set(&keys.countdown_active(), &countdown.is_active.to_string())?;
    store.set(&keys.saved_at(), &saved_at_ms.to_string())?;
    Ok(())
}

/// Remove every key this prefix owns.
pub fn clear_session(store: &mut dyn SessionStore, keys: &SessionKeys) -> Result<(), StoreError> {
    for key in keys.all() {
        store.remove(&key)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionSnapshot {
        let mut tracking = TrackingByKind::default();
        tracking.welcome.has_triggered = true;
        tracking.welcome.page_views = 3;
        tracking.urgency.has_added_to_cart = true;
        SessionSnapshot {
            tracking,
            countdown: CountdownSnapshot {
                remaining_secs: 321,
                is_active: true,
            },
            saved_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let store = MemoryStore::new();
        assert_eq!(
            load_snapshot(&store, &SessionKeys::default(), 600).unwrap(),
            None
        );
    }

    #[test]
    fn saved_snapshot_reads_back() {
        let mut store = MemoryStore::new();
        let keys = SessionKeys::default();
        save_snapshot(&mut store, &keys, &sample()).unwrap();
        assert_eq!(store.raw("popcue.countdown.remaining").as_deref(), Some("321"));
        assert_eq!(store.raw("popcue.countdown.active").as_deref(), Some("true"));
        assert_eq!(load_snapshot(&store, &keys, 600).unwrap(), Some(sample()));
    }

    #[test]
    fn corrupt_tracking_is_a_restore_error() {
        let mut store = MemoryStore::new();
        let keys = SessionKeys::default();
        save_snapshot(&mut store, &keys, &sample()).unwrap();
        store.set("popcue.tracking.exit", "{not json").unwrap();

        let err = load_snapshot(&store, &keys, 600).unwrap_err();
        match err {
            RestoreError::Corrupt { key, .. } => assert_eq!(key, "popcue.tracking.exit"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn corrupt_timestamp_is_a_restore_error() {
        let mut store = MemoryStore::new();
        store.set("popcue.saved_at", "yesterday").unwrap();
        assert!(load_snapshot(&store, &SessionKeys::default(), 600).is_err());
    }

    #[test]
    fn missing_countdown_keys_use_defaults() {
        let mut store = MemoryStore::new();
        store.set("popcue.saved_at", "5").unwrap();
        let snap = load_snapshot(&store, &SessionKeys::default(), 600)
            .unwrap()
            .unwrap();
        assert_eq!(snap.countdown.remaining_secs, 600);
        assert!(!snap.countdown.is_active);
        assert_eq!(snap.tracking, TrackingByKind::default());
    }

    #[test]
    fn clear_removes_only_prefixed_keys() {
        let mut store = MemoryStore::new();
        let keys = SessionKeys::new("shop");
        save_snapshot(&mut store, &keys, &sample()).unwrap();
        store.set("unrelated", "keep").unwrap();

        clear_session(&mut store, &keys).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.raw("unrelated").as_deref(), Some("keep"));
    }
}

//! Session-scoped local cache.
//!
//! A tiny in-memory string key-value store, shared by handle (clone = same
//! storage). The progress store owns the single `lesson_progress` entry; the
//! logout collaborator calls `clear()` when the session ends. Nothing here
//! survives the process; durable storage is the remote service's job.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::ProgressSnapshot;

/// Key of the one entry the progress store maintains.
pub const PROGRESS_KEY: &str = "lesson_progress";

/// The serialized shape of the progress entry: the snapshot plus the moment
/// it was last written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedProgress {
  pub snapshot: ProgressSnapshot,
  pub last_updated: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionCache {
  slots: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<String> {
    self
      .slots
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(key)
      .cloned()
  }

  pub fn put(&self, key: &str, value: String) {
    self
      .slots
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key.to_string(), value);
  }

  pub fn remove(&self, key: &str) {
    self
      .slots
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(key);
  }

  /// Wipe everything. Called by the logout collaborator.
  pub fn clear(&self) {
    self
      .slots
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
  }

  /// Typed read of the progress entry. A malformed entry is dropped (and
  /// removed) rather than surfaced, so the caller treats it as a cache miss.
  pub fn load_progress(&self) -> Option<CachedProgress> {
    let raw = self.get(PROGRESS_KEY)?;
    match serde_json::from_str::<CachedProgress>(&raw) {
      Ok(entry) => Some(entry),
      Err(e) => {
        warn!(target: "progress", error = %e, "Dropping malformed cached progress entry");
        self.remove(PROGRESS_KEY);
        None
      }
    }
  }

  /// Typed write of the progress entry. Serialization failure is logged and
  /// swallowed; the in-memory snapshot remains the source of local truth.
  pub fn store_progress(&self, snapshot: &ProgressSnapshot, now: DateTime<Utc>) {
    let entry = CachedProgress {
      snapshot: snapshot.clone(),
      last_updated: now,
    };
    match serde_json::to_string(&entry) {
      Ok(raw) => self.put(PROGRESS_KEY, raw),
      Err(e) => error!(target: "progress", error = %e, "Failed to serialize progress for the cache"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn progress_entry_round_trips() {
    let cache = SessionCache::new();
    let mut snapshot = ProgressSnapshot::empty();
    snapshot.completed.insert(1);
    snapshot.completed.insert(2);

    cache.store_progress(&snapshot, Utc::now());
    let loaded = cache.load_progress().expect("entry present");
    assert_eq!(
      loaded.snapshot.completed.iter().copied().collect::<Vec<_>>(),
      vec![1, 2]
    );
  }

  #[test]
  fn malformed_entries_count_as_a_miss_and_are_removed() {
    let cache = SessionCache::new();
    cache.put(PROGRESS_KEY, "not json at all".into());
    assert!(cache.load_progress().is_none());
    assert!(cache.get(PROGRESS_KEY).is_none(), "bad entry was removed");
  }

  #[test]
  fn clones_share_storage_and_clear_wipes_it() {
    let cache = SessionCache::new();
    let handle = cache.clone();
    cache.put("k", "v".into());
    assert_eq!(handle.get("k").as_deref(), Some("v"));
    handle.clear();
    assert!(cache.get("k").is_none());
  }
}

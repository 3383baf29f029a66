//! Persistent key-value access for the response cache.
//!
//! The store knows nothing about features, payloads or freshness. It keeps
//! plain strings under plain keys; choosing keys that do not collide is the
//! caller's job (see `cache::FeatureKey`).

mod memory;
mod sqlite;

use color_eyre::Result;
use std::sync::Arc;

pub use memory::{MemoryStore, NoopStore};
pub use sqlite::SqliteStore;

/// Store handle shared by every feature cache in the process.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Trait for string key-value backends.
pub trait KeyValueStore: Send + Sync {
  /// Read a value. Backend failures are reported as absence.
  fn get(&self, key: &str) -> Option<String>;

  /// Write a value. May fail (quota exceeded, store unavailable).
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Delete a value. Removing an absent key is not an error.
  fn remove(&self, key: &str) -> Result<()>;

  /// Write several keys as one unit.
  ///
  /// On failure every key written so far is put back to its previous value,
  /// so an existing entry is never left half-overwritten.
  fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
    let mut previous: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());

    for &(key, value) in entries {
      let before = self.get(key);
      if let Err(e) = self.set(key, value) {
        for (written, old) in previous.into_iter().rev() {
          let restored = match old {
            Some(old) => self.set(written, &old),
            None => self.remove(written),
          };
          if let Err(restore_err) = restored {
            tracing::warn!(key = written, error = %restore_err, "Failed to restore cache key");
          }
        }
        return Err(e);
      }
      previous.push((key, before));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_many_restores_previous_values_on_failure() {
    // Room for the first pair but not for the second write
    let store = MemoryStore::with_quota(40);
    store.set("aData", "[1]").unwrap();
    store.set("aTimestamp", "1").unwrap();

    let result = store.set_many(&[("aData", "[1,2,3,4]"), ("aTimestamp", "1700000000000000000")]);
    assert!(result.is_err());

    assert_eq!(store.get("aData").as_deref(), Some("[1]"));
    assert_eq!(store.get("aTimestamp").as_deref(), Some("1"));
  }

  #[test]
  fn test_set_many_removes_new_keys_on_failure() {
    let store = MemoryStore::with_quota(12);

    let result = store.set_many(&[("bData", "[1]"), ("bTimestamp", "1700000000000")]);
    assert!(result.is_err());

    assert_eq!(store.get("bData"), None);
    assert_eq!(store.get("bTimestamp"), None);
  }
}

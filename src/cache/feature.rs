//! Per-feature cache entries stored as a payload key and a timestamp key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::traits::CachePayload;
use crate::store::SharedStore;

/// Staleness threshold for most list pages.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(300_000);

/// Staleness threshold for reference data that rarely changes.
pub const REFERENCE_STALE_AFTER: Duration = Duration::from_millis(600_000);

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}

/// Identifies one feature's cache slot and how long it stays fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureKey {
  name: String,
  stale_after: Duration,
}

impl FeatureKey {
  pub fn new(name: impl Into<String>, stale_after: Duration) -> Self {
    Self {
      name: name.into(),
      stale_after,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn stale_after(&self) -> Duration {
    self.stale_after
  }

  /// Key holding the JSON payload, e.g. `studentsData`.
  pub fn data_key(&self) -> String {
    format!("{}Data", self.name)
  }

  /// Key holding the epoch-millisecond write time, e.g. `studentsTimestamp`.
  pub fn timestamp_key(&self) -> String {
    format!("{}Timestamp", self.name)
  }
}

/// A decoded cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
  pub payload: T,
  pub stored_at_ms: i64,
}

impl<T> CacheEntry<T> {
  pub fn age_ms(&self, now_ms: i64) -> i64 {
    now_ms - self.stored_at_ms
  }

  /// Fresh while `0 <= age < threshold`. A timestamp from the future is
  /// treated as stale so a bad clock cannot pin an entry forever.
  pub fn is_fresh(&self, now_ms: i64, stale_after: Duration) -> bool {
    let age = self.age_ms(now_ms);
    age >= 0 && (age as u128) < stale_after.as_millis()
  }
}

/// Summary of a feature's cache slot, used by `cache status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
  pub present: bool,
  pub age_ms: Option<i64>,
  pub fresh: bool,
}

/// Per-feature invalidation counters, shared by every cache over one store.
///
/// `invalidate` bumps a feature's counter; a write stamped with an older
/// value is dropped, so a fetch that raced an invalidation cannot restore
/// the snapshot it was fetching.
#[derive(Clone, Default)]
pub struct Generations(Arc<Mutex<HashMap<String, u64>>>);

impl Generations {
  fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
    // Counters stay valid even if a holder panicked
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Read/write access to one feature's pair of keys.
#[derive(Clone)]
pub struct FeatureCache {
  key: FeatureKey,
  store: SharedStore,
  generations: Generations,
}

impl FeatureCache {
  pub fn new(key: FeatureKey, store: SharedStore) -> Self {
    Self {
      key,
      store,
      generations: Generations::default(),
    }
  }

  /// Share invalidation counters with the other caches over the same store.
  pub fn with_generations(mut self, generations: Generations) -> Self {
    self.generations = generations;
    self
  }

  pub fn key(&self) -> &FeatureKey {
    &self.key
  }

  /// Current invalidation counter. Take it before fetching and hand it to
  /// [`write`](Self::write).
  pub fn generation(&self) -> u64 {
    self.generations.lock().get(self.key.name()).copied().unwrap_or(0)
  }

  /// Read and decode the entry, fresh or not.
  ///
  /// A missing key, an unparseable timestamp, a payload that does not decode
  /// into `T`, or a blank payload all count as a miss.
  pub fn read<T: CachePayload>(&self) -> Option<CacheEntry<T>> {
    let feature = self.key.name();
    let raw = self.store.get(&self.key.data_key())?;

    let stored_at_ms = match self
      .store
      .get(&self.key.timestamp_key())
      .and_then(|ts| ts.trim().parse::<i64>().ok())
    {
      Some(ts) => ts,
      None => {
        debug!(feature, "Cache payload has no usable timestamp");
        return None;
      }
    };

    let payload: T = match serde_json::from_str(&raw) {
      Ok(payload) => payload,
      Err(e) => {
        debug!(feature, error = %e, "Discarding undecodable cache payload");
        return None;
      }
    };

    if payload.is_blank() {
      return None;
    }

    Some(CacheEntry {
      payload,
      stored_at_ms,
    })
  }

  /// Read the entry only if it is still fresh.
  pub fn read_fresh<T: CachePayload>(&self) -> Option<CacheEntry<T>> {
    let entry = self.read::<T>()?;
    let now = now_millis();
    if entry.is_fresh(now, self.key.stale_after()) {
      debug!(feature = self.key.name(), age_ms = entry.age_ms(now), "Cache hit");
      Some(entry)
    } else {
      debug!(feature = self.key.name(), age_ms = entry.age_ms(now), "Cache stale");
      None
    }
  }

  /// Store a payload with the current time, unless the feature was
  /// invalidated since `generation` was taken. Returns whether the slot was
  /// updated.
  ///
  /// Blank payloads remove the keys instead. Write failures are logged and
  /// leave any existing entry in place.
  pub fn write<T: CachePayload>(&self, payload: &T, generation: u64) -> bool {
    let counters = self.generations.lock();
    if counters.get(self.key.name()).copied().unwrap_or(0) != generation {
      debug!(feature = self.key.name(), "Invalidated during fetch, not caching");
      return false;
    }

    if payload.is_blank() {
      debug!(feature = self.key.name(), "Empty result, invalidating cache");
      self.remove_keys();
      return true;
    }

    let raw = match serde_json::to_string(payload) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(feature = self.key.name(), error = %e, "Failed to serialize cache payload");
        return false;
      }
    };
    let timestamp = now_millis().to_string();
    let data_key = self.key.data_key();
    let timestamp_key = self.key.timestamp_key();

    match self.store.set_many(&[
      (data_key.as_str(), raw.as_str()),
      (timestamp_key.as_str(), timestamp.as_str()),
    ]) {
      Ok(()) => true,
      Err(e) => {
        warn!(feature = self.key.name(), error = %e, "Failed to write cache, keeping previous entry");
        false
      }
    }
  }

  /// Remove both keys and discard writes from fetches already under way.
  pub fn invalidate(&self) {
    let mut counters = self.generations.lock();
    *counters.entry(self.key.name().to_string()).or_insert(0) += 1;
    self.remove_keys();
  }

  fn remove_keys(&self) {
    for key in [self.key.data_key(), self.key.timestamp_key()] {
      if let Err(e) = self.store.remove(&key) {
        warn!(feature = self.key.name(), key = %key, error = %e, "Failed to remove cache key");
      }
    }
  }

  /// Inspect the raw slot without decoding the payload type.
  pub fn status(&self) -> CacheStatus {
    let present = self.store.get(&self.key.data_key()).is_some();
    let stored_at = self
      .store
      .get(&self.key.timestamp_key())
      .and_then(|ts| ts.trim().parse::<i64>().ok());

    match (present, stored_at) {
      (true, Some(stored_at_ms)) => {
        let entry = CacheEntry {
          payload: (),
          stored_at_ms,
        };
        let now = now_millis();
        CacheStatus {
          present,
          age_ms: Some(entry.age_ms(now)),
          fresh: entry.is_fresh(now, self.key.stale_after()),
        }
      }
      _ => CacheStatus {
        present,
        age_ms: None,
        fresh: false,
      },
    }
  }
}

/// Human-readable age, e.g. "just now", "5m ago", "2h ago".
pub fn age_display(age_ms: i64) -> String {
  let minutes = age_ms / 60_000;
  if minutes < 1 {
    // Also covers clock skew
    "just now".to_string()
  } else if minutes < 60 {
    format!("{}m ago", minutes)
  } else if minutes < 1440 {
    format!("{}h ago", minutes / 60)
  } else {
    format!("{}d ago", minutes / 1440)
  }
}

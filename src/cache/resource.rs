//! Page-side binding of a fetch controller: display state, loading flag and
//! the background reconciliation tasks.
//!
//! Modelled on a TanStack-style query, but seeded synchronously from the
//! local cache so a warm page paints without a loading flash:
//!
//! ```ignore
//! let mut query = CachedQuery::new(controller); // reads cache, no I/O
//! query.load(false);                             // exactly once on mount
//!
//! // In the event loop tick
//! if query.poll() {
//!     // data or loading flag changed, re-render
//! }
//! ```

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::controller::FetchController;
use super::traits::CachePayload;

/// Lifecycle of the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Nothing in flight
  Idle,
  /// Showing cached data; a silent reconciliation may be in flight
  ServingCache,
  /// Waiting on a fetch with nothing fresh to show
  Fetching,
}

/// Whether a fetch drives the visible loading indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
  Foreground,
  Background,
}

struct FetchOutcome<T> {
  /// `cancel()` bumps the generation; older outcomes are dropped unapplied
  generation: u64,
  mode: FetchMode,
  result: Result<T, String>,
}

/// Stale-while-revalidate query bound to one page.
///
/// Dropping the query aborts every fetch it started, so a page that goes
/// away is never updated afterwards.
pub struct CachedQuery<T> {
  controller: FetchController<T>,
  data: Option<T>,
  loading: bool,
  error: Option<String>,
  phase: Phase,
  sender: mpsc::UnboundedSender<FetchOutcome<T>>,
  receiver: mpsc::UnboundedReceiver<FetchOutcome<T>>,
  tasks: Vec<JoinHandle<()>>,
  pending: usize,
  pending_foreground: usize,
  generation: u64,
}

impl<T: CachePayload> CachedQuery<T> {
  /// Build the initial display state from the cache. Performs no fetch.
  pub fn new(controller: FetchController<T>) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    let seeded = controller.cached();
    let (loading, phase) = match seeded {
      Some(_) => (false, Phase::ServingCache),
      None => (true, Phase::Idle),
    };

    Self {
      controller,
      data: seeded,
      loading,
      error: None,
      phase,
      sender,
      receiver,
      tasks: Vec::new(),
      pending: 0,
      pending_foreground: 0,
      generation: 0,
    }
  }

  /// Load data, serving the cache first when allowed.
  ///
  /// - `false` with a fresh cache: show it and reconcile in the background.
  /// - `false` without one: foreground fetch behind the loading indicator.
  /// - `true`: background fetch; the loading indicator is left alone.
  pub fn load(&mut self, force_refresh: bool) {
    debug!(
      feature = self.controller.feature().name(),
      phase = ?self.phase,
      force_refresh,
      "Loading"
    );
    if force_refresh {
      self.spawn_fetch(FetchMode::Background);
      return;
    }

    if let Some(payload) = self.controller.cached() {
      self.data = Some(payload);
      self.loading = false;
      self.error = None;
      self.phase = Phase::ServingCache;
      self.spawn_fetch(FetchMode::Background);
      return;
    }

    self.loading = true;
    self.phase = Phase::Fetching;
    self.spawn_fetch(FetchMode::Foreground);
  }

  /// Reconcile with the server without touching the loading indicator.
  pub fn refresh(&mut self) {
    self.load(true);
  }

  /// Apply finished fetches in completion order.
  ///
  /// Returns `true` if anything changed. Call this in your event loop tick.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    while let Ok(outcome) = self.receiver.try_recv() {
      if outcome.generation != self.generation {
        continue;
      }
      changed = true;
      self.pending = self.pending.saturating_sub(1);

      match outcome.result {
        Ok(payload) => {
          self.data = Some(payload);
          self.error = None;
        }
        Err(error) => {
          // Last-known-good data stays on screen
          if outcome.mode == FetchMode::Foreground {
            self.error = Some(error);
          }
        }
      }

      if outcome.mode == FetchMode::Foreground {
        self.pending_foreground = self.pending_foreground.saturating_sub(1);
        if self.pending_foreground == 0 {
          self.loading = false;
        }
      }
    }

    if changed {
      self.tasks.retain(|task| !task.is_finished());
      if self.pending == 0 {
        self.phase = Phase::Idle;
        self.loading = false;
      }
    }

    changed
  }

  /// Abort every fetch still in flight. Results that were already sent
  /// are discarded.
  pub fn cancel(&mut self) {
    for task in self.tasks.drain(..) {
      task.abort();
    }
    self.generation += 1;
    while self.receiver.try_recv().is_ok() {}
    self.pending = 0;
    if self.pending_foreground > 0 {
      self.pending_foreground = 0;
      self.loading = false;
    }
    self.phase = Phase::Idle;
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  #[cfg(test)]
  pub fn phase(&self) -> Phase {
    self.phase
  }

  /// Number of fetches started and not yet applied.
  #[cfg(test)]
  pub fn in_flight(&self) -> usize {
    self.pending
  }

  pub fn controller(&self) -> &FetchController<T> {
    &self.controller
  }

  fn spawn_fetch(&mut self, mode: FetchMode) {
    self.pending += 1;
    if mode == FetchMode::Foreground {
      self.pending_foreground += 1;
    } else if self.phase != Phase::ServingCache {
      self.phase = Phase::Fetching;
    }

    let controller = self.controller.clone();
    let tx = self.sender.clone();
    let generation = self.generation;
    let task = tokio::spawn(async move {
      let result = controller.fetch_remote().await.map_err(|e| e.to_string());
      // Ignore send errors - the query may have been dropped
      let _ = tx.send(FetchOutcome {
        generation,
        mode,
        result,
      });
    });
    self.tasks.push(task);
  }
}

impl<T> Drop for CachedQuery<T> {
  fn drop(&mut self) {
    for task in &self.tasks {
      task.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CachedQuery<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CachedQuery")
      .field("feature", self.controller.feature())
      .field("data", &self.data)
      .field("loading", &self.loading)
      .field("phase", &self.phase)
      .field("pending", &self.pending)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::feature::{now_millis, FeatureKey, DEFAULT_STALE_AFTER};
  use crate::store::{KeyValueStore, MemoryStore};
  use color_eyre::eyre::eyre;
  use serde::{Deserialize, Serialize};
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Row {
    id: i64,
    name: String,
  }

  fn row(id: i64, name: &str) -> Row {
    Row {
      id,
      name: name.to_string(),
    }
  }

  /// Scripted server: each call pops the next (delay, response).
  #[derive(Clone, Default)]
  struct Script {
    responses: Arc<Mutex<VecDeque<(u64, Result<Vec<Row>, String>)>>>,
    calls: Arc<AtomicUsize>,
  }

  impl Script {
    fn respond(self, delay_ms: u64, response: Result<Vec<Row>, &str>) -> Self {
      self
        .responses
        .lock()
        .unwrap()
        .push_back((delay_ms, response.map_err(String::from)));
      self
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }

    fn controller(&self, store: Arc<MemoryStore>) -> FetchController<Vec<Row>> {
      let script = self.clone();
      FetchController::new(
        FeatureKey::new("rows", DEFAULT_STALE_AFTER),
        store,
        move || {
          script.calls.fetch_add(1, Ordering::SeqCst);
          let next = script.responses.lock().unwrap().pop_front();
          async move {
            let (delay, response) = next.unwrap_or((0, Ok(Vec::new())));
            tokio::time::sleep(Duration::from_millis(delay)).await;
            response.map_err(|e| eyre!(e))
          }
        },
      )
    }
  }

  fn seed(store: &MemoryStore, rows: &[Row], age_ms: i64) {
    store
      .set("rowsData", &serde_json::to_string(rows).unwrap())
      .unwrap();
    store
      .set("rowsTimestamp", &(now_millis() - age_ms).to_string())
      .unwrap();
  }

  /// Poll until nothing is in flight, recording whether loading was ever shown.
  async fn settle(query: &mut CachedQuery<Vec<Row>>) -> bool {
    let mut saw_loading = query.is_loading();
    for _ in 0..200 {
      query.poll();
      saw_loading |= query.is_loading();
      if query.in_flight() == 0 {
        return saw_loading;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("query did not settle");
  }

  #[tokio::test]
  async fn test_cache_hit_seeds_without_loading() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[row(1, "Ana")], 10_000);
    let script = Script::default().respond(0, Ok(vec![row(1, "Ana")]));

    let query = CachedQuery::new(script.controller(store));

    assert!(!query.is_loading());
    assert_eq!(query.phase(), Phase::ServingCache);
    assert_eq!(query.data().unwrap()[0].name, "Ana");
    // Seeding never touches the network
    assert_eq!(script.calls(), 0);
  }

  #[tokio::test]
  async fn test_cache_miss_shows_loading_until_resolved() {
    let store = Arc::new(MemoryStore::new());
    let script = Script::default().respond(10, Ok(vec![row(2, "Ben")]));

    let mut query = CachedQuery::new(script.controller(store.clone()));
    assert!(query.is_loading());
    assert!(query.data().is_none());

    query.load(false);
    assert!(query.is_loading());
    assert_eq!(query.phase(), Phase::Fetching);

    settle(&mut query).await;
    assert!(!query.is_loading());
    assert_eq!(query.phase(), Phase::Idle);
    assert_eq!(query.data().unwrap(), &vec![row(2, "Ben")]);
    assert!(store.get("rowsData").is_some());
  }

  #[tokio::test]
  async fn test_stale_cache_forces_single_foreground_fetch() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[row(1, "Old")], 400_000);
    let script = Script::default().respond(5, Ok(vec![row(1, "New")]));

    let mut query = CachedQuery::new(script.controller(store));
    assert!(query.is_loading());
    assert!(query.data().is_none());

    query.load(false);
    settle(&mut query).await;

    assert_eq!(script.calls(), 1);
    assert_eq!(query.data().unwrap()[0].name, "New");
  }

  #[tokio::test]
  async fn test_background_reconciliation_never_shows_loading() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[row(1, "Ana")], 10_000);
    let script = Script::default().respond(10, Ok(vec![row(1, "Ana"), row(2, "Ben")]));

    let mut query = CachedQuery::new(script.controller(store));
    query.load(false);
    assert!(!query.is_loading());
    assert_eq!(query.phase(), Phase::ServingCache);

    let saw_loading = settle(&mut query).await;
    assert!(!saw_loading);
    assert_eq!(script.calls(), 1);
    assert_eq!(query.data().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_background_failure_keeps_cached_data() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[row(1, "Ana")], 10_000);
    let script = Script::default().respond(5, Err("connection refused"));

    let mut query = CachedQuery::new(script.controller(store.clone()));
    query.load(false);

    let saw_loading = settle(&mut query).await;
    assert!(!saw_loading);
    assert_eq!(query.data().unwrap(), &vec![row(1, "Ana")]);
    assert!(query.error().is_none());
    assert!(store.get("rowsData").is_some());
  }

  #[tokio::test]
  async fn test_foreground_failure_records_error() {
    let store = Arc::new(MemoryStore::new());
    let script = Script::default().respond(5, Err("500 Internal Server Error"));

    let mut query = CachedQuery::new(script.controller(store.clone()));
    query.load(false);
    settle(&mut query).await;

    assert!(!query.is_loading());
    assert!(query.data().is_none());
    assert!(query.error().unwrap().contains("500"));
    assert_eq!(store.get("rowsData"), None);
  }

  #[tokio::test]
  async fn test_empty_background_result_clears_cache_and_display() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[row(1, "Ana")], 10_000);
    let script = Script::default().respond(5, Ok(Vec::new()));

    let mut query = CachedQuery::new(script.controller(store.clone()));
    query.load(false);
    assert_eq!(query.data().unwrap().len(), 1);

    settle(&mut query).await;
    assert_eq!(store.get("rowsData"), None);
    assert_eq!(store.get("rowsTimestamp"), None);
    assert!(query.data().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_corrupted_cache_behaves_like_miss() {
    let store = Arc::new(MemoryStore::new());
    store.set("rowsData", "<<not json>>").unwrap();
    store.set("rowsTimestamp", &now_millis().to_string()).unwrap();
    let script = Script::default().respond(5, Ok(vec![row(3, "Cy")]));

    let mut query = CachedQuery::new(script.controller(store));
    assert!(query.is_loading());

    query.load(false);
    assert_eq!(query.phase(), Phase::Fetching);
    settle(&mut query).await;
    assert_eq!(query.data().unwrap(), &vec![row(3, "Cy")]);
  }

  #[tokio::test]
  async fn test_last_resolved_fetch_wins() {
    let store = Arc::new(MemoryStore::new());
    let script = Script::default()
      .respond(40, Ok(vec![row(1, "Slow")]))
      .respond(5, Ok(vec![row(2, "Fast")]));

    let mut query = CachedQuery::new(script.controller(store.clone()));
    query.refresh();
    query.refresh();
    assert_eq!(query.in_flight(), 2);

    settle(&mut query).await;
    assert!(!query.is_loading());
    assert_eq!(query.data().unwrap()[0].name, "Slow");
    assert!(store.get("rowsData").unwrap().contains("Slow"));
  }

  #[tokio::test]
  async fn test_drop_aborts_in_flight_fetch() {
    let store = Arc::new(MemoryStore::new());
    let script = Script::default().respond(50, Ok(vec![row(1, "Late")]));

    let mut query = CachedQuery::new(script.controller(store.clone()));
    query.load(false);
    // Let the fetch start before the page goes away
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(query);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(script.calls(), 1);
    assert_eq!(store.get("rowsData"), None);
  }

  #[tokio::test]
  async fn test_cancel_clears_loading() {
    let store = Arc::new(MemoryStore::new());
    let script = Script::default().respond(50, Ok(vec![row(1, "Late")]));

    let mut query = CachedQuery::new(script.controller(store));
    query.load(false);
    query.cancel();

    assert!(!query.is_loading());
    assert_eq!(query.in_flight(), 0);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!query.poll());
    assert!(query.data().is_none());
  }

  #[tokio::test]
  async fn test_load_after_cancel_ignores_finished_fetch() {
    let store = Arc::new(MemoryStore::new());
    let script = Script::default()
      .respond(0, Ok(Vec::new()))
      .respond(200, Ok(vec![row(2, "Fresh")]));

    let mut query = CachedQuery::new(script.controller(store));
    query.load(false);
    // First fetch finishes and queues its result before the cancel
    tokio::time::sleep(Duration::from_millis(30)).await;
    query.cancel();

    query.load(false);
    assert!(!query.poll());
    assert!(query.is_loading());
    assert_eq!(query.in_flight(), 1);
    assert_eq!(query.phase(), Phase::Fetching);
    assert!(query.data().is_none());

    settle(&mut query).await;
    assert!(!query.is_loading());
    assert_eq!(query.data().unwrap(), &vec![row(2, "Fresh")]);
  }
}

//! Fetch controller: one feature's cache slot paired with its remote fetcher.

use color_eyre::Result;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::feature::{FeatureCache, FeatureKey, Generations};
use super::traits::CachePayload;
use crate::store::SharedStore;

/// A boxed future that resolves to a fetched payload.
pub type BoxFuture<T> = futures::future::BoxFuture<'static, Result<T>>;

/// A factory function that creates futures for fetching data.
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Generic cache-and-refresh controller, parameterized by feature key,
/// staleness threshold (carried by the key) and fetcher.
///
/// The controller itself is stateless apart from the store; display state
/// lives in [`CachedQuery`](super::CachedQuery).
pub struct FetchController<T> {
  cache: FeatureCache,
  fetcher: FetcherFn<T>,
}

impl<T: CachePayload> FetchController<T> {
  /// Create a controller for `feature` backed by `store`.
  ///
  /// The fetcher is called once per remote fetch and must produce a fresh
  /// future each time.
  pub fn new<F, Fut>(feature: FeatureKey, store: SharedStore, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    Self {
      cache: FeatureCache::new(feature, store),
      fetcher: Arc::new(move || fetcher().boxed()),
    }
  }

  /// Share invalidation counters with other controllers over the same store.
  pub fn with_generations(mut self, generations: Generations) -> Self {
    self.cache = self.cache.with_generations(generations);
    self
  }

  /// Fresh cached payload, if any. Never touches the network.
  pub fn cached(&self) -> Option<T> {
    self.cache.read_fresh::<T>().map(|entry| entry.payload)
  }

  /// Call the remote endpoint and reconcile the cache with its answer.
  ///
  /// On success the cache is overwritten (or cleared for an empty result),
  /// unless the feature was invalidated while the request was out.
  /// On failure the cache is left untouched. No retries.
  pub async fn fetch_remote(&self) -> Result<T> {
    let feature = self.cache.key().name();
    debug!(feature, "Fetching from server");

    let generation = self.cache.generation();
    match (self.fetcher)().await {
      Ok(payload) => {
        self.cache.write(&payload, generation);
        Ok(payload)
      }
      Err(e) => {
        warn!(feature, error = %e, "Fetch failed");
        Err(e)
      }
    }
  }

  /// Drop the feature's cached entry.
  pub fn invalidate(&self) {
    self.cache.invalidate();
  }
}

impl<T> FetchController<T> {
  pub fn feature(&self) -> &FeatureKey {
    self.cache.key()
  }
}

impl<T> Clone for FetchController<T> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      fetcher: Arc::clone(&self.fetcher),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::feature::DEFAULT_STALE_AFTER;
  use crate::store::{KeyValueStore, MemoryStore};
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn key() -> FeatureKey {
    FeatureKey::new("payments", DEFAULT_STALE_AFTER)
  }

  #[tokio::test]
  async fn test_fetch_remote_writes_cache() {
    let store = Arc::new(MemoryStore::new());
    let controller = FetchController::new(key(), store.clone(), || async {
      Ok(vec!["OR-001".to_string()])
    });

    assert_eq!(controller.cached(), None);

    let fetched = controller.fetch_remote().await.unwrap();
    assert_eq!(fetched, vec!["OR-001".to_string()]);
    assert_eq!(store.get("paymentsData").as_deref(), Some("[\"OR-001\"]"));
    assert_eq!(controller.cached(), Some(vec!["OR-001".to_string()]));
  }

  #[tokio::test]
  async fn test_fetch_remote_failure_keeps_cache() {
    let store = Arc::new(MemoryStore::new());
    store.set("paymentsData", "[\"OR-009\"]").unwrap();
    store
      .set("paymentsTimestamp", &crate::cache::now_millis().to_string())
      .unwrap();

    let controller: FetchController<Vec<String>> =
      FetchController::new(key(), store.clone(), || async { Err(eyre!("503")) });

    assert!(controller.fetch_remote().await.is_err());
    assert_eq!(store.get("paymentsData").as_deref(), Some("[\"OR-009\"]"));
  }

  #[tokio::test]
  async fn test_empty_result_clears_cache() {
    let store = Arc::new(MemoryStore::new());
    store.set("paymentsData", "[\"OR-009\"]").unwrap();
    store.set("paymentsTimestamp", "1").unwrap();

    let controller = FetchController::new(key(), store.clone(), || async {
      Ok(Vec::<String>::new())
    });

    assert!(controller.fetch_remote().await.unwrap().is_empty());
    assert_eq!(store.get("paymentsData"), None);
    assert_eq!(store.get("paymentsTimestamp"), None);
  }

  #[tokio::test]
  async fn test_invalidate_during_fetch_skips_write() {
    let store = Arc::new(MemoryStore::new());
    let (started_tx, started) = tokio::sync::oneshot::channel::<()>();
    let (release, gate) = tokio::sync::oneshot::channel::<()>();
    let first = Arc::new(tokio::sync::Mutex::new(Some((started_tx, gate))));
    let controller = FetchController::new(key(), store.clone(), move || {
      let first = first.clone();
      async move {
        if let Some((started_tx, gate)) = first.lock().await.take() {
          let _ = started_tx.send(());
          let _ = gate.await;
        }
        Ok(vec!["OR-001 pending".to_string()])
      }
    });

    let fetching = tokio::spawn({
      let controller = controller.clone();
      async move { controller.fetch_remote().await }
    });
    started.await.unwrap();
    controller.invalidate();
    release.send(()).unwrap();

    // The caller still gets the answer, the cache does not
    assert_eq!(fetching.await.unwrap().unwrap(), vec!["OR-001 pending".to_string()]);
    assert_eq!(store.get("paymentsData"), None);

    controller.fetch_remote().await.unwrap();
    assert!(store.get("paymentsData").is_some());
  }

  #[tokio::test]
  async fn test_fetcher_called_once_per_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let controller = FetchController::new(key(), Arc::new(MemoryStore::new()), move || {
      let counter = counter.clone();
      async move { Ok(vec![counter.fetch_add(1, Ordering::SeqCst)]) }
    });

    controller.fetch_remote().await.unwrap();
    controller.clone().fetch_remote().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}

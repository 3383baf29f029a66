//! One-shot async operations (saves, verifications, submissions) driven
//! from the UI tick.
//!
//! ```ignore
//! let school = school.clone();
//! self.action.start(async move { school.verify_payment(id).await });
//!
//! // In the event loop tick
//! if let Some(result) = self.action.poll() {
//!     // show success or error, refresh the page
//! }
//! ```
//!
//! List data does not go through here; pages use
//! [`CachedQuery`](crate::cache::CachedQuery) for that.

use color_eyre::Result;
use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Nothing started yet
  Idle,
  /// Operation in flight
  Running,
  /// Completed successfully
  Success(T),
  /// Failed with an error message
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_running(&self) -> bool {
    matches!(self, QueryState::Running)
  }
}

/// A single async operation whose result is picked up by polling.
///
/// Starting while another run is in flight is refused; dropping the query
/// aborts the run.
pub struct Query<T> {
  state: QueryState<T>,
  receiver: Option<oneshot::Receiver<Result<T, String>>>,
  task: Option<JoinHandle<()>>,
}

impl<T> Default for Query<T> {
  fn default() -> Self {
    Self {
      state: QueryState::Idle,
      receiver: None,
      task: None,
    }
  }
}

impl<T: Send + 'static> Query<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_running(&self) -> bool {
    self.state.is_running()
  }

  /// Spawn `future`. Returns `false` (and does nothing) if a run is
  /// already in flight.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    if self.is_running() {
      return false;
    }

    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    self.state = QueryState::Running;
    self.task = Some(tokio::spawn(async move {
      let result = future.await.map_err(|e| e.to_string());
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    }));
    true
  }

  /// Pick up a finished run.
  ///
  /// Returns the outcome once, the tick it arrives; the state keeps it.
  pub fn poll(&mut self) -> Option<&QueryState<T>> {
    let receiver = self.receiver.as_mut()?;

    let state = match receiver.try_recv() {
      Ok(Ok(data)) => QueryState::Success(data),
      Ok(Err(error)) => QueryState::Error(error),
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => {
        QueryState::Error("Operation was cancelled".to_string())
      }
    };

    self.state = state;
    self.receiver = None;
    self.task = None;
    Some(&self.state)
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(task) = &self.task {
      task.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  async fn settle<T: Send + 'static>(query: &mut Query<T>) {
    for _ in 0..50 {
      if query.poll().is_some() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new();
    assert_eq!(query.state, QueryState::Idle);

    assert!(query.start(async { Ok(vec![1, 2, 3]) }));
    assert!(query.is_running());

    settle(&mut query).await;
    assert_eq!(query.state, QueryState::Success(vec![1, 2, 3]));
    // Outcome is reported once
    assert!(query.poll().is_none());
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<()> = Query::new();
    query.start(async { Err(eyre!("Payment already verified")) });

    settle(&mut query).await;
    assert_eq!(
      query.state,
      QueryState::Error("Payment already verified".to_string())
    );
    assert!(!query.is_running());
  }

  #[tokio::test]
  async fn test_start_while_running_is_refused() {
    let mut query = Query::new();
    assert!(query.start(async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok(1)
    }));
    assert!(!query.start(async { Ok(2) }));

    settle(&mut query).await;
    assert_eq!(query.state, QueryState::Success(1));
  }

  #[tokio::test]
  async fn test_drop_aborts_run() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();

    let mut query = Query::new();
    query.start(async move {
      tokio::time::sleep(Duration::from_millis(30)).await;
      flag.store(true, Ordering::SeqCst);
      Ok(())
    });
    drop(query);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!finished.load(Ordering::SeqCst));
  }
}

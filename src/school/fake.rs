//! Scripted transport for tests.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::client::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
  pub method: Method,
  pub path: String,
  pub body: Option<Value>,
}

type Reply = (Duration, Result<Value, String>);

/// Replies are queued per path and consumed in order; an unscripted path
/// answers `[]` for GET and `{}` otherwise.
#[derive(Clone, Default)]
pub struct FakeTransport {
  replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
  calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reply(&self, path: &str, value: Value) -> &Self {
    self.reply_after(path, Duration::ZERO, Ok(value))
  }

  pub fn fail(&self, path: &str, message: &str) -> &Self {
    self.reply_after(path, Duration::ZERO, Err(message.to_string()))
  }

  pub fn reply_after(&self, path: &str, delay: Duration, result: Result<Value, String>) -> &Self {
    self
      .replies
      .lock()
      .unwrap()
      .entry(path.to_string())
      .or_default()
      .push_back((delay, result));
    self
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn calls_to(&self, path: &str) -> usize {
    self.calls().iter().filter(|c| c.path == path).count()
  }

  async fn answer(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
    let is_get = method == Method::GET;
    self.calls.lock().unwrap().push(Call {
      method,
      path: path.to_string(),
      body,
    });

    let scripted = self
      .replies
      .lock()
      .unwrap()
      .get_mut(path)
      .and_then(|queue| queue.pop_front());

    let (delay, result) = scripted.unwrap_or_else(|| {
      let default = if is_get {
        Value::Array(Vec::new())
      } else {
        Value::Object(Default::default())
      };
      (Duration::ZERO, Ok(default))
    });

    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    result.map_err(|e| eyre!(e))
  }
}

impl Transport for FakeTransport {
  async fn get(&self, path: &str) -> Result<Value> {
    self.answer(Method::GET, path, None).await
  }

  async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value> {
    self.answer(method, path, Some(body)).await
  }
}

use color_eyre::{eyre::eyre, Result};
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;

/// Longest error body echoed back to the user.
const MAX_ERROR_BODY: usize = 200;

/// JSON-over-HTTP access to the school API.
///
/// Implemented by [`SchoolClient`]; tests substitute a scripted fake.
pub trait Transport: Clone + Send + Sync + 'static {
  /// GET `path` and return the decoded JSON body.
  fn get(&self, path: &str) -> impl Future<Output = Result<Value>> + Send;

  /// Send a state-changing request with a JSON body.
  fn send(&self, method: Method, path: &str, body: Value)
    -> impl Future<Output = Result<Value>> + Send;
}

/// School API client.
/// Clone is cheap, the underlying reqwest client is reference counted.
#[derive(Clone)]
pub struct SchoolClient {
  client: Client,
  base_url: Url,
  token: Option<String>,
}

impl SchoolClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut base_url = Url::parse(&config.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url {}: {}", config.api.base_url, e))?;
    // Relative joins keep the base path only when it ends with a slash
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      token: Config::api_token(),
    })
  }

  /// Resolve an API path under the base URL, keeping any base path
  /// (e.g. `https://host/portal` + `/api/x` is `https://host/portal/api/x`).
  fn url(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| eyre!("Invalid request path {}: {}", path, e))
  }

  async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
    let url = self.url(path)?;
    debug!(%method, %url, "Sending request");

    let mut request = self
      .client
      .request(method.clone(), url)
      .header(header::ACCEPT, "application/json");
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("{} {} failed: {}", method, path, e))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", path, e))?;

    if !status.is_success() {
      return Err(eyre!(error_message(status, &text)));
    }

    if text.trim().is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| eyre!("Failed to parse response from {}: {}", path, e))
  }
}

impl Transport for SchoolClient {
  async fn get(&self, path: &str) -> Result<Value> {
    self.execute(Method::GET, path, None).await
  }

  async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value> {
    self.execute(method, path, Some(body)).await
  }
}

/// Message for a non-2xx response: the body's `message` or `error` field,
/// else the status line and the (truncated) body.
fn error_message(status: StatusCode, body: &str) -> String {
  let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
    ["message", "error"]
      .iter()
      .find_map(|field| v.get(field).and_then(Value::as_str).map(String::from))
  });

  match from_json {
    Some(message) => message,
    None if body.trim().is_empty() => status.to_string(),
    None => format!("{}: {}", status, truncate_body(body.trim())),
  }
}

fn truncate_body(body: &str) -> String {
  if body.chars().count() <= MAX_ERROR_BODY {
    body.to_string()
  } else {
    let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("{}...", cut)
  }
}

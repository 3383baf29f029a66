//! Core traits for cached payloads.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Trait for values that can be stored in a feature cache.
///
/// A blank payload (an empty list, a JSON null) is never cached: writing one
/// removes the feature's keys so the next mount performs a real fetch.
pub trait CachePayload: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Whether this payload should invalidate the cache instead of being stored.
  fn is_blank(&self) -> bool;
}

impl<T> CachePayload for Vec<T>
where
  T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
  fn is_blank(&self) -> bool {
    self.is_empty()
  }
}

impl<T> CachePayload for Option<T>
where
  T: CachePayload,
{
  fn is_blank(&self) -> bool {
    self.as_ref().map(CachePayload::is_blank).unwrap_or(true)
  }
}

impl CachePayload for Value {
  fn is_blank(&self) -> bool {
    match self {
      Value::Null => true,
      Value::Array(items) => items.is_empty(),
      Value::Object(fields) => fields.is_empty(),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_empty_vec_is_blank() {
    assert!(Vec::<i32>::new().is_blank());
    assert!(!vec![1].is_blank());
  }

  #[test]
  fn test_json_values() {
    assert!(Value::Null.is_blank());
    assert!(json!([]).is_blank());
    assert!(json!({}).is_blank());
    assert!(!json!({"student_id": 1}).is_blank());
    assert!(!json!(0).is_blank());
  }

  #[test]
  fn test_option_payload() {
    let none: Option<Vec<i32>> = None;
    assert!(none.is_blank());
    assert!(Some(Vec::<i32>::new()).is_blank());
    assert!(!Some(vec![1]).is_blank());
  }
}

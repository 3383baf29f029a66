//! School client with per-feature stale-while-revalidate caching.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;

use crate::cache::{
  CachePayload, CacheStatus, CachedQuery, FeatureCache, FetchController, Generations,
};
use crate::config::CacheConfig;
use crate::registration::RegistrationSubmission;
use crate::store::SharedStore;

use super::client::{SchoolClient, Transport};
use super::features::Feature;
use super::types::{DocumentStatus, GradeEntry, NewDocumentRequest, TuitionFee};

/// School API access with transparent list caching.
///
/// Reads go through a [`FetchController`] per feature. Every mutation drops
/// the cache of the features it affects before the request is sent and again
/// once it settles. Fetches that were out during that window do not write
/// back, so the next read never serves the pre-mutation snapshot.
#[derive(Clone)]
pub struct CachedSchoolClient<Tr = SchoolClient> {
  transport: Tr,
  store: SharedStore,
  cache: CacheConfig,
  generations: Generations,
}

impl<Tr: Transport> CachedSchoolClient<Tr> {
  pub fn new(transport: Tr, store: SharedStore, cache: CacheConfig) -> Self {
    Self {
      transport,
      store,
      cache,
      generations: Generations::default(),
    }
  }

  fn feature_cache(&self, feature: Feature) -> FeatureCache {
    FeatureCache::new(feature.key(&self.cache), self.store.clone())
      .with_generations(self.generations.clone())
  }

  /// Controller fetching `feature`'s endpoint and decoding it into `T`.
  pub fn controller<T>(&self, feature: Feature) -> FetchController<T>
  where
    T: CachePayload + DeserializeOwned,
  {
    let transport = self.transport.clone();
    let endpoint = feature.endpoint();

    FetchController::new(feature.key(&self.cache), self.store.clone(), move || {
      let transport = transport.clone();
      async move {
        let value = transport.get(endpoint).await?;
        serde_json::from_value(value)
          .map_err(|e| eyre!("Unexpected response from {}: {}", endpoint, e))
      }
    })
    .with_generations(self.generations.clone())
  }

  /// Page binding for `feature`, seeded from the cache. Call `load(false)`
  /// once to start fetching.
  pub fn query<T>(&self, feature: Feature) -> CachedQuery<T>
  where
    T: CachePayload + DeserializeOwned,
  {
    CachedQuery::new(self.controller(feature))
  }

  pub fn cache_status(&self, feature: Feature) -> CacheStatus {
    self.feature_cache(feature).status()
  }

  /// Drop one feature's cache, or all of them.
  pub fn clear_cache(&self, feature: Option<Feature>) -> Vec<Feature> {
    let features = match feature {
      Some(feature) => vec![feature],
      None => Feature::ALL.to_vec(),
    };
    self.invalidate(&features);
    features
  }

  fn invalidate(&self, features: &[Feature]) {
    for feature in features {
      self.feature_cache(*feature).invalidate();
    }
  }

  async fn mutate(
    &self,
    method: Method,
    path: &str,
    body: Value,
    affects: &[Feature],
  ) -> Result<Value> {
    self.invalidate(affects);
    info!(%method, path, "Sending update");
    let result = self.transport.send(method, path, body).await;
    // Reads started while the request was out may predate the change
    self.invalidate(affects);
    result
  }

  pub async fn save_grades(&self, entries: &[GradeEntry]) -> Result<()> {
    let body = json!({ "grades": entries });
    self
      .mutate(Method::PUT, "/api/grades", body, &[Feature::Grades])
      .await?;
    Ok(())
  }

  pub async fn verify_payment(&self, payment_id: i64) -> Result<()> {
    let path = format!("/api/payments/{}/verify", payment_id);
    self
      .mutate(
        Method::PUT,
        &path,
        json!({}),
        &[Feature::Payments, Feature::StudentBalances],
      )
      .await?;
    Ok(())
  }

  pub async fn verify_enrollment(&self, enrollment_id: i64) -> Result<()> {
    let path = format!("/api/enrollments/{}/verify", enrollment_id);
    self
      .mutate(
        Method::PUT,
        &path,
        json!({}),
        &[Feature::Enrollments, Feature::Students],
      )
      .await?;
    Ok(())
  }

  pub async fn assign_block(&self, enrollment_id: i64, block: &str) -> Result<()> {
    let path = format!("/api/enrollments/{}/block", enrollment_id);
    self
      .mutate(
        Method::PUT,
        &path,
        json!({ "block": block }),
        &[Feature::Enrollments],
      )
      .await?;
    Ok(())
  }

  pub async fn update_tuition_fee(&self, fee: &TuitionFee) -> Result<()> {
    let path = format!("/api/tuition-fees/{}", fee.id);
    let body = serde_json::to_value(fee)?;
    self
      .mutate(
        Method::PUT,
        &path,
        body,
        &[Feature::TuitionFees, Feature::StudentBalances],
      )
      .await?;
    Ok(())
  }

  pub async fn request_document(&self, request: &NewDocumentRequest) -> Result<()> {
    let body = serde_json::to_value(request)?;
    self
      .mutate(
        Method::POST,
        "/api/document-requests",
        body,
        &[Feature::DocumentRequests],
      )
      .await?;
    Ok(())
  }

  pub async fn update_document_status(&self, request_id: i64, status: DocumentStatus) -> Result<()> {
    let path = format!("/api/document-requests/{}/status", request_id);
    self
      .mutate(
        Method::PUT,
        &path,
        json!({ "status": status.label() }),
        &[Feature::DocumentRequests],
      )
      .await?;
    Ok(())
  }

  /// Submit a registration. Returns the assigned student number, if the
  /// server sends one back.
  pub async fn register_student(&self, submission: &RegistrationSubmission) -> Result<Option<String>> {
    let body = serde_json::to_value(submission)?;
    let response = self
      .mutate(
        Method::POST,
        "/api/register",
        body,
        &[Feature::Students, Feature::Enrollments],
      )
      .await?;
    Ok(
      response
        .get("student_number")
        .and_then(Value::as_str)
        .map(String::from),
    )
  }
}

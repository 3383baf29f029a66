//! Catalogue of cached list features.

use std::time::Duration;

use crate::cache::{FeatureKey, DEFAULT_STALE_AFTER, REFERENCE_STALE_AFTER};
use crate::config::CacheConfig;

/// A list endpoint with its own cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
  Students,
  StudentBalances,
  Payments,
  Enrollments,
  Courses,
  Grades,
  TuitionFees,
  Programs,
  DocumentRequests,
}

impl Feature {
  pub const ALL: [Feature; 9] = [
    Feature::Students,
    Feature::StudentBalances,
    Feature::Payments,
    Feature::Enrollments,
    Feature::Courses,
    Feature::Grades,
    Feature::TuitionFees,
    Feature::Programs,
    Feature::DocumentRequests,
  ];

  /// Cache key prefix; store keys are `<name>Data` and `<name>Timestamp`.
  pub fn name(self) -> &'static str {
    match self {
      Feature::Students => "students",
      Feature::StudentBalances => "studentBalances",
      Feature::Payments => "payments",
      Feature::Enrollments => "enrollments",
      Feature::Courses => "courses",
      Feature::Grades => "grades",
      Feature::TuitionFees => "tuitionFees",
      Feature::Programs => "programs",
      Feature::DocumentRequests => "documentRequests",
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Feature::Students => "Students",
      Feature::StudentBalances => "Student Balances",
      Feature::Payments => "Payments",
      Feature::Enrollments => "Enrollments",
      Feature::Courses => "Courses",
      Feature::Grades => "Grades",
      Feature::TuitionFees => "Tuition Fees",
      Feature::Programs => "Programs",
      Feature::DocumentRequests => "Document Requests",
    }
  }

  pub fn endpoint(self) -> &'static str {
    match self {
      Feature::Students => "/api/students",
      Feature::StudentBalances => "/api/student-balances",
      Feature::Payments => "/api/payments",
      Feature::Enrollments => "/api/enrollments",
      Feature::Courses => "/api/courses",
      Feature::Grades => "/api/grades",
      Feature::TuitionFees => "/api/tuition-fees",
      Feature::Programs => "/api/programs",
      Feature::DocumentRequests => "/api/document-requests",
    }
  }

  /// Default staleness threshold. Reference data changes rarely.
  pub fn default_stale_after(self) -> Duration {
    match self {
      Feature::Programs => REFERENCE_STALE_AFTER,
      _ => DEFAULT_STALE_AFTER,
    }
  }

  pub fn page_size(self) -> usize {
    match self {
      Feature::Courses | Feature::Grades | Feature::Programs => 20,
      _ => 10,
    }
  }

  /// Cache slot for this feature, honouring configured overrides.
  pub fn key(self, config: &CacheConfig) -> FeatureKey {
    FeatureKey::new(
      self.name(),
      config.stale_after(self.name(), self.default_stale_after()),
    )
  }

  /// Look up a feature by key prefix, case-insensitively.
  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
  }
}

impl std::fmt::Display for Feature {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_feature_keys_are_unique() {
    let data_keys: HashSet<String> = Feature::ALL
      .iter()
      .map(|f| f.key(&CacheConfig::default()).data_key())
      .collect();
    assert_eq!(data_keys.len(), Feature::ALL.len());
  }

  #[test]
  fn test_default_thresholds() {
    let config = CacheConfig::default();
    assert_eq!(
      Feature::Payments.key(&config).stale_after(),
      Duration::from_millis(300_000)
    );
    assert_eq!(
      Feature::Programs.key(&config).stale_after(),
      Duration::from_millis(600_000)
    );
  }

  #[test]
  fn test_configured_threshold_override() {
    let mut config = CacheConfig::default();
    config.stale_after_ms.insert("grades".to_string(), 1_000);
    let key = Feature::Grades.key(&config);
    assert_eq!(key.stale_after(), Duration::from_secs(1));
    assert_eq!(key.timestamp_key(), "gradesTimestamp");
  }

  #[test]
  fn test_from_name() {
    assert_eq!(
      Feature::from_name("studentbalances"),
      Some(Feature::StudentBalances)
    );
    assert_eq!(Feature::from_name("tuitionFees"), Some(Feature::TuitionFees));
    assert_eq!(Feature::from_name("library"), None);
  }

  #[test]
  fn test_page_sizes() {
    assert_eq!(Feature::Grades.page_size(), 20);
    assert_eq!(Feature::StudentBalances.page_size(), 10);
  }
}

//! Stale-while-revalidate response cache for list pages.
//!
//! One generic module replaces the per-page copies of the same logic:
//! - `FeatureKey` names a feature's two store keys and its staleness threshold
//! - `FetchController` pairs that slot with a remote fetcher
//! - `CachedQuery` is the page-side binding: instant paint from a fresh
//!   cache, then a silent reconciliation; a visible fetch otherwise
//!
//! Empty results are never cached, corrupted entries are cache misses, and
//! failed writes keep whatever entry was there before.

mod controller;
mod feature;
mod resource;
mod traits;

pub use controller::{BoxFuture, FetchController};
pub use feature::{
  age_display, CacheStatus, FeatureCache, FeatureKey, Generations, DEFAULT_STALE_AFTER,
  REFERENCE_STALE_AFTER,
};
pub use resource::CachedQuery;
pub use traits::CachePayload;

#[cfg(test)]
pub use feature::now_millis;
#[cfg(test)]
pub use resource::Phase;

//! OLSHCOnnect school API: records, the feature catalogue and clients.

mod cached_client;
mod client;
#[cfg(test)]
pub mod fake;
mod features;
pub mod types;

pub use cached_client::CachedSchoolClient;
pub use client::{SchoolClient, Transport};
pub use features::Feature;

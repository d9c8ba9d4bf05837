//! Geocoding protocol.

use async_trait::async_trait;

use super::models::LatLon;

/// Resolves free-text addresses to coordinates.
///
/// Best effort: `None` covers an empty result set, a malformed response,
/// and transport failure alike. Implementations never error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves one address.
    async fn geocode(&self, address: &str) -> Option<LatLon>;
}

//! Address geocoding.
//!
//! This module provides:
//! - Diacritic stripping for geocoding queries
//! - The [`Geocoder`] protocol and a Bing Maps implementation
//! - Coordinate models

#[cfg(feature = "http")]
mod bing;
mod models;
mod normalize;
mod protocols;

#[cfg(feature = "http")]
pub use bing::{parse_bing_response, BingMapsGeocoder};
pub use models::{GeoPoint, LatLon};
pub use normalize::strip_accents;
pub use protocols::Geocoder;

#[cfg(test)]
pub use protocols::MockGeocoder;

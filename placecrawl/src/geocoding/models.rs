//! Coordinate records.

use serde::{Deserialize, Serialize};

/// A coordinate pair as returned by a geocoding backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLon {
    /// Creates a coordinate pair.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Attaches a place title.
    #[must_use]
    pub fn titled(self, title: impl Into<String>) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
            title: title.into(),
        }
    }
}

/// A resolved, titled location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Title of the extracted place.
    pub title: String,
}

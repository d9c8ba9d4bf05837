//! Bing Maps location lookup.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::models::LatLon;
use super::normalize::strip_accents;
use super::protocols::Geocoder;
use crate::config::GeocodingConfig;
use crate::observability::SpanTimer;

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(rename = "resourceSets", default)]
    resource_sets: Vec<ResourceSet>,
}

#[derive(Debug, Deserialize)]
struct ResourceSet {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    point: Option<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// Reads the first candidate's coordinates from a Locations API body.
///
/// Bing orders coordinates `[latitude, longitude]`. Returns `None` for an
/// empty result set or any shape it does not recognize.
#[must_use]
pub fn parse_bing_response(body: &str) -> Option<LatLon> {
    let response: LocationResponse = serde_json::from_str(body).ok()?;
    let point = response
        .resource_sets
        .into_iter()
        .next()?
        .resources
        .into_iter()
        .next()?
        .point?;

    match point.coordinates.as_slice() {
        [lat, lon, ..] => Some(LatLon::new(*lat, *lon)),
        _ => None,
    }
}

/// Geocoder backed by the Bing Maps Locations API.
#[derive(Debug, Clone)]
pub struct BingMapsGeocoder {
    http_client: reqwest::Client,
    config: GeocodingConfig,
}

impl BingMapsGeocoder {
    /// Creates a geocoder on a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: &GeocodingConfig) -> Self {
        Self {
            http_client,
            config: config.clone(),
        }
    }

    async fn lookup(&self, query: &str) -> Result<String, String> {
        let max_results = self.config.max_results.to_string();
        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[
                ("query", query),
                ("key", self.config.api_key.expose()),
                ("maxResults", max_results.as_str()),
            ])
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Geocoder for BingMapsGeocoder {
    async fn geocode(&self, address: &str) -> Option<LatLon> {
        let query = strip_accents(address);
        let query = query.trim();
        if query.is_empty() {
            debug!(address = %address, "Skipping empty geocode query");
            return None;
        }

        let timer = SpanTimer::start("geocode");
        let body = match self.lookup(query).await {
            Ok(body) => body,
            Err(error) => {
                warn!(query = %query, error = %error, "Geocode lookup failed");
                return None;
            }
        };

        let location = parse_bing_response(&body);
        match location {
            Some(point) => debug!(
                query = %query,
                lat = point.lat,
                lon = point.lon,
                duration_ms = timer.finish(),
                "Geocoded address"
            ),
            None => debug!(query = %query, duration_ms = timer.finish(), "No geocode candidate"),
        }
        location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubServer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_first_candidate_lat_lon_order() {
        let body = r#"{
            "statusCode": 200,
            "resourceSets": [{
                "estimatedTotal": 1,
                "resources": [{
                    "name": "Königsallee 5, 40212 Düsseldorf",
                    "point": {"type": "Point", "coordinates": [51.2245, 6.7792]}
                }]
            }]
        }"#;

        assert_eq!(parse_bing_response(body), Some(LatLon::new(51.2245, 6.7792)));
    }

    #[test]
    fn test_parse_empty_result_set() {
        let body = r#"{"resourceSets": [{"estimatedTotal": 0, "resources": []}]}"#;
        assert_eq!(parse_bing_response(body), None);
        assert_eq!(parse_bing_response(r#"{"resourceSets": []}"#), None);
    }

    #[test]
    fn test_parse_malformed_response() {
        assert_eq!(parse_bing_response("not json"), None);
        assert_eq!(parse_bing_response("{}"), None);
        assert_eq!(
            parse_bing_response(r#"{"resourceSets": [{"resources": [{"point": {"coordinates": [1.0]}}]}]}"#),
            None
        );
        assert_eq!(
            parse_bing_response(r#"{"resourceSets": [{"resources": [{"name": "x"}]}]}"#),
            None
        );
    }

    #[tokio::test]
    async fn test_empty_address_short_circuits() {
        let geocoder = BingMapsGeocoder::new(
            reqwest::Client::new(),
            &GeocodingConfig::new("http://127.0.0.1:9/REST/v1/Locations", "k"),
        );
        assert_eq!(geocoder.geocode("   ").await, None);
    }

    #[tokio::test]
    async fn test_transport_error_is_a_miss() {
        let mut config = GeocodingConfig::new("http://127.0.0.1:9/REST/v1/Locations", "k");
        config.timeout_seconds = 2.0;
        let geocoder = BingMapsGeocoder::new(reqwest::Client::new(), &config);

        assert_eq!(geocoder.geocode("Hauptstrasse 1, Berlin").await, None);
    }

    #[tokio::test]
    async fn test_error_status_is_a_miss() {
        for status in [401, 404, 503] {
            let server = StubServer::respond(status, r#"{"errorDetails": ["nope"]}"#)
                .await
                .unwrap();
            let config = GeocodingConfig::new(format!("{}/REST/v1/Locations", server.url()), "k");
            let geocoder = BingMapsGeocoder::new(reqwest::Client::new(), &config);

            assert_eq!(geocoder.geocode("Hauptstrasse 1, Berlin").await, None);
            assert_eq!(server.requests().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_lookup_sends_stripped_query() {
        let body = r#"{"resourceSets": [{"resources": [{"point": {"coordinates": [48.137, 11.575]}}]}]}"#;
        let server = StubServer::respond(200, body).await.unwrap();
        let config = GeocodingConfig::new(format!("{}/REST/v1/Locations", server.url()), "k");
        let geocoder = BingMapsGeocoder::new(reqwest::Client::new(), &config);

        let location = geocoder.geocode("  Marienplatz 1, München ").await;

        assert_eq!(location, Some(LatLon::new(48.137, 11.575)));
        let request = &server.requests()[0];
        assert!(request.starts_with("GET /REST/v1/Locations?"));
        assert!(request.contains("query=Marienplatz+1%2C+Munchen"));
        assert!(request.contains("key=k"));
        assert!(request.contains("maxResults=1"));
    }
}

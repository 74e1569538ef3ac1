// src/services/google_maps_client.rs
// DOCUMENTATION: Google Maps Platform client
// PURPOSE: Nearby Search and Distance Matrix calls behind the provider traits

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::num::NonZeroU32;

use crate::errors::LocatorError;
use crate::models::{Coordinate, Place};
use crate::services::enrichment::{RoadDistance, RoadDistanceProvider};
use crate::services::place_query::NearbySearch;

/// Distance Matrix accepts at most this many destinations per request
pub const MAX_DESTINATIONS_PER_REQUEST: usize = 25;

/// Google Maps API client
/// DOCUMENTATION: Handles authentication, throttling and API calls to the
/// Places and Distance Matrix web services
pub struct GoogleMapsClient {
    /// HTTP client for making requests
    client: Client,
    /// Google Maps API key
    api_key: String,
    /// Base URL for Google Maps web services
    base_url: String,
    /// Outgoing request throttle shared by both endpoints
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

/// Response from Google Places Nearby Search
#[derive(Debug, Deserialize, Serialize)]
pub struct GooglePlacesResponse {
    /// Results array from API
    #[serde(default)]
    pub results: Vec<GooglePlace>,
    /// Status of the API call
    pub status: String,
    /// Error message (if status is not OK)
    pub error_message: Option<String>,
}

/// Individual place from Google Places API
/// DOCUMENTATION: Only the fields the station list needs. `place_id` and
/// `geometry` are optional here so a broken payload is reported as such
/// instead of failing the whole JSON decode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GooglePlace {
    /// Google's unique place identifier
    pub place_id: Option<String>,
    /// Place name
    pub name: Option<String>,
    /// Vicinity (short address, from Nearby Search)
    pub vicinity: Option<String>,
    /// Rating (0-5)
    pub rating: Option<f32>,
    /// Geographic location
    pub geometry: Option<GoogleGeometry>,
}

/// Geographic location from Google
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleGeometry {
    /// Location coordinates
    pub location: GoogleLocation,
}

/// Coordinates from Google
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleLocation {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

/// Response from the Distance Matrix API
#[derive(Debug, Deserialize, Serialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DistanceMatrixRow {
    #[serde(default)]
    pub elements: Vec<DistanceMatrixElement>,
}

/// One origin/destination pair
#[derive(Debug, Deserialize, Serialize)]
pub struct DistanceMatrixElement {
    pub status: String,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
}

/// `{ "text": "1.2 km", "value": 1234 }`
#[derive(Debug, Deserialize, Serialize)]
pub struct TextValue {
    pub text: String,
    pub value: f64,
}

impl GooglePlacesResponse {
    /// Convert a nearby search response into places, keeping provider order
    pub fn into_places(self) -> Result<Vec<Place>, LocatorError> {
        match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            "OVER_QUERY_LIMIT" => {
                log::error!("Google Places API quota exceeded");
                return Err(LocatorError::RateLimitExceeded);
            }
            other => {
                let msg = self
                    .error_message
                    .unwrap_or_else(|| format!("Unknown status: {}", other));
                log::error!("Google Places API status {}: {}", other, msg);
                return Err(LocatorError::ProviderQuery(format!("{}: {}", other, msg)));
            }
        }

        self.results
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| {
                let id = raw.place_id.ok_or_else(|| {
                    LocatorError::ProviderQuery(format!("result {} has no place_id", idx))
                })?;
                let location = raw.geometry.map(|g| g.location).ok_or_else(|| {
                    LocatorError::ProviderQuery(format!("result {} ({}) has no geometry", idx, id))
                })?;

                Ok(Place {
                    vicinity: raw.vicinity,
                    rating: raw.rating,
                    ..Place::new(
                        id,
                        raw.name.unwrap_or_default(),
                        Coordinate::new(location.lat, location.lng),
                    )
                })
            })
            .collect()
    }
}

impl DistanceMatrixResponse {
    /// Convert a single-origin matrix into per-destination distances
    /// DOCUMENTATION: Output index i is destination i of the request. Any
    /// element that is not OK fails the whole batch.
    pub fn into_distances(self, expected: usize) -> Result<Vec<RoadDistance>, LocatorError> {
        if self.status != "OK" {
            let msg = self.error_message.unwrap_or_default();
            return Err(LocatorError::Enrichment(format!(
                "matrix status {}: {}",
                self.status, msg
            )));
        }

        let row = match self.rows.into_iter().next() {
            Some(row) => row,
            None => return Err(LocatorError::Enrichment("matrix has no rows".to_string())),
        };

        if row.elements.len() != expected {
            return Err(LocatorError::Enrichment(format!(
                "matrix returned {} elements for {} destinations",
                row.elements.len(),
                expected
            )));
        }

        row.elements
            .into_iter()
            .enumerate()
            .map(|(idx, element)| match (element.status.as_str(), element.distance, element.duration) {
                ("OK", Some(distance), Some(duration)) => Ok(RoadDistance {
                    meters: distance.value,
                    distance_text: distance.text,
                    duration_text: duration.text,
                }),
                (status, _, _) => Err(LocatorError::Enrichment(format!(
                    "element {} status {}",
                    idx, status
                ))),
            })
            .collect()
    }
}

impl GoogleMapsClient {
    /// Create new Google Maps API client
    /// DOCUMENTATION: Initializes client with API key, base URL and request rate
    pub fn new(api_key: String, base_url: String, rate_per_sec: u32) -> Self {
        let per_second = NonZeroU32::new(rate_per_sec).unwrap_or(NonZeroU32::MIN);
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, String> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error {}: {}", status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| format!("Parse error: {}", e))
    }

    async fn matrix_chunk(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<RoadDistance>, LocatorError> {
        let url = format!("{}/distancematrix/json", self.base_url);
        let joined = destinations
            .iter()
            .map(Coordinate::to_query_value)
            .collect::<Vec<_>>()
            .join("|");

        let params = [
            ("origins", origin.to_query_value()),
            ("destinations", joined),
            ("units", "metric".to_string()),
        ];

        let response: DistanceMatrixResponse =
            self.get_json(&url, &params).await.map_err(|e| {
                log::warn!("Distance Matrix request failed: {}", e);
                LocatorError::Enrichment(e)
            })?;

        response.into_distances(destinations.len())
    }
}

#[async_trait]
impl NearbySearch for GoogleMapsClient {
    async fn nearby_search(
        &self,
        center: Coordinate,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<Place>, LocatorError> {
        let url = format!("{}/place/nearbysearch/json", self.base_url);
        let params = [
            ("location", center.to_query_value()),
            ("radius", radius_m.to_string()),
            ("type", category.to_string()),
        ];

        log::debug!(
            "Google Places nearby search: center={}, radius={}, type={}",
            center,
            radius_m,
            category
        );

        let response: GooglePlacesResponse =
            self.get_json(&url, &params).await.map_err(|e| {
                log::error!("Google Places nearby search failed: {}", e);
                LocatorError::ProviderQuery(e)
            })?;

        let places = response.into_places()?;
        log::info!("Google Places search returned {} results", places.len());
        Ok(places)
    }
}

#[async_trait]
impl RoadDistanceProvider for GoogleMapsClient {
    async fn road_distances(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<RoadDistance>, LocatorError> {
        fetch_in_chunks(destinations, MAX_DESTINATIONS_PER_REQUEST, |chunk| async move {
            self.matrix_chunk(origin, &chunk).await
        })
        .await
    }
}

/// Run `fetch` over consecutive chunks and concatenate the answers
/// DOCUMENTATION: Chunks are requested one after another, so entry `i` of
/// the result belongs to `destinations[i]`. A chunk answering with the wrong
/// number of entries fails the whole batch.
async fn fetch_in_chunks<F, Fut>(
    destinations: &[Coordinate],
    chunk_size: usize,
    mut fetch: F,
) -> Result<Vec<RoadDistance>, LocatorError>
where
    F: FnMut(Vec<Coordinate>) -> Fut,
    Fut: Future<Output = Result<Vec<RoadDistance>, LocatorError>>,
{
    let mut distances = Vec::with_capacity(destinations.len());

    for chunk in destinations.chunks(chunk_size.max(1)) {
        let answer = fetch(chunk.to_vec()).await?;
        if answer.len() != chunk.len() {
            return Err(LocatorError::Enrichment(format!(
                "expected {} distances for chunk at {}, got {}",
                chunk.len(),
                distances.len(),
                answer.len()
            )));
        }
        distances.extend(answer);
    }

    Ok(distances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nearby(value: serde_json::Value) -> GooglePlacesResponse {
        serde_json::from_value(value).unwrap()
    }

    fn matrix(value: serde_json::Value) -> DistanceMatrixResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_nearby_response_to_places() {
        let response = nearby(json!({
            "status": "OK",
            "results": [
                {
                    "place_id": "ChIJ1",
                    "name": "Fuel One",
                    "vicinity": "Main St 1",
                    "rating": 4.2,
                    "geometry": { "location": { "lat": 39.83, "lng": -98.58 } },
                    "types": ["gas_station", "point_of_interest"]
                },
                {
                    "place_id": "ChIJ2",
                    "name": "Fuel Two",
                    "geometry": { "location": { "lat": 39.84, "lng": -98.57 } }
                }
            ]
        }));

        let places = response.into_places().unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].id, "ChIJ1");
        assert_eq!(places[0].vicinity.as_deref(), Some("Main St 1"));
        assert_eq!(places[0].rating, Some(4.2));
        assert_eq!(places[1].position, Coordinate::new(39.84, -98.57));
        assert!(places[1].distance_meters.is_none());
    }

    #[test]
    fn test_nearby_zero_results_is_empty() {
        let response = nearby(json!({ "status": "ZERO_RESULTS", "results": [] }));
        assert!(response.into_places().unwrap().is_empty());
    }

    #[test]
    fn test_nearby_status_errors() {
        let denied = nearby(json!({ "status": "REQUEST_DENIED", "error_message": "bad key" }));
        assert!(matches!(denied.into_places(), Err(LocatorError::ProviderQuery(_))));

        let quota = nearby(json!({ "status": "OVER_QUERY_LIMIT" }));
        assert_eq!(quota.into_places(), Err(LocatorError::RateLimitExceeded));
    }

    #[test]
    fn test_nearby_malformed_result() {
        let response = nearby(json!({
            "status": "OK",
            "results": [{ "place_id": "ChIJ1", "name": "No Geometry" }]
        }));
        assert!(matches!(response.into_places(), Err(LocatorError::ProviderQuery(_))));
    }

    #[test]
    fn test_matrix_elements_in_order() {
        let response = matrix(json!({
            "status": "OK",
            "rows": [{ "elements": [
                { "status": "OK", "distance": { "text": "1.2 km", "value": 1200 }, "duration": { "text": "3 mins", "value": 180 } },
                { "status": "OK", "distance": { "text": "850 m", "value": 850 }, "duration": { "text": "2 mins", "value": 120 } }
            ]}]
        }));

        let distances = response.into_distances(2).unwrap();
        assert_eq!(distances[0].meters, 1200.0);
        assert_eq!(distances[0].duration_text, "3 mins");
        assert_eq!(distances[1].distance_text, "850 m");
    }

    #[test]
    fn test_matrix_partial_failure_fails_batch() {
        let response = matrix(json!({
            "status": "OK",
            "rows": [{ "elements": [
                { "status": "OK", "distance": { "text": "1.2 km", "value": 1200 }, "duration": { "text": "3 mins", "value": 180 } },
                { "status": "ZERO_RESULTS" }
            ]}]
        }));
        assert!(matches!(response.into_distances(2), Err(LocatorError::Enrichment(_))));
    }

    #[test]
    fn test_matrix_count_mismatch() {
        let response = matrix(json!({
            "status": "OK",
            "rows": [{ "elements": [
                { "status": "OK", "distance": { "text": "1 km", "value": 1000 }, "duration": { "text": "1 min", "value": 60 } }
            ]}]
        }));
        assert!(response.into_distances(3).is_err());

        let no_rows = matrix(json!({ "status": "OK", "rows": [] }));
        assert!(no_rows.into_distances(1).is_err());
    }

    #[test]
    fn test_client_normalizes_base_url() {
        let client = GoogleMapsClient::new(
            "test_key".to_string(),
            "https://maps.example.com/api/".to_string(),
            0,
        );
        assert_eq!(client.base_url, "https://maps.example.com/api");
    }

    fn by_longitude(chunk: &[Coordinate]) -> Vec<RoadDistance> {
        chunk
            .iter()
            .map(|c| RoadDistance {
                meters: c.lng,
                distance_text: format!("{} m", c.lng),
                duration_text: "1 min".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunked_distances_keep_index_alignment() {
        let destinations: Vec<Coordinate> =
            (0..60).map(|i| Coordinate::new(40.0, i as f64)).collect();
        let mut chunk_sizes = Vec::new();

        let distances = fetch_in_chunks(&destinations, MAX_DESTINATIONS_PER_REQUEST, |chunk| {
            chunk_sizes.push(chunk.len());
            async move { Ok(by_longitude(&chunk)) }
        })
        .await
        .unwrap();

        assert_eq!(chunk_sizes, vec![25, 25, 10]);
        assert_eq!(distances.len(), 60);
        for (i, distance) in distances.iter().enumerate() {
            assert_eq!(distance.meters, i as f64);
        }
    }

    #[tokio::test]
    async fn test_short_chunk_fails_the_batch() {
        let destinations: Vec<Coordinate> =
            (0..30).map(|i| Coordinate::new(40.0, i as f64)).collect();
        let mut calls = 0;

        let result = fetch_in_chunks(&destinations, MAX_DESTINATIONS_PER_REQUEST, |chunk| {
            calls += 1;
            let mut answer = by_longitude(&chunk);
            if calls == 2 {
                answer.pop();
            }
            async move { Ok(answer) }
        })
        .await;

        assert!(matches!(result, Err(LocatorError::Enrichment(_))));
        assert_eq!(calls, 2);
    }
}

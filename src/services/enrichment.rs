// src/services/enrichment.rs
// DOCUMENTATION: Distance enrichment service
// PURPOSE: Attach distance/ETA to places, road-network first with a haversine fallback

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::LocatorError;
use crate::models::{Coordinate, Place};

/// Road distance for one destination
#[derive(Debug, Clone, PartialEq)]
pub struct RoadDistance {
    pub meters: f64,
    pub distance_text: String,
    pub duration_text: String,
}

/// Provider side of the road-network method
/// DOCUMENTATION: Must return exactly one entry per destination, where
/// entry i belongs to destination i.
#[async_trait]
pub trait RoadDistanceProvider: Send + Sync {
    async fn road_distances(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<RoadDistance>, LocatorError>;
}

/// Format meters for display
/// DOCUMENTATION: "N m" under 1 km, "N.N km" under 10 km, "N km" above
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else if meters < 10_000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} km", meters / 1000.0)
    }
}

/// Enriches places with distance information
#[derive(Clone)]
pub struct DistanceEnricher {
    road: Option<Arc<dyn RoadDistanceProvider>>,
    timeout: Duration,
}

impl DistanceEnricher {
    pub fn new(road: Option<Arc<dyn RoadDistanceProvider>>, timeout: Duration) -> Self {
        Self { road, timeout }
    }

    /// Haversine-only enricher
    pub fn great_circle() -> Self {
        Self::new(None, Duration::from_secs(10))
    }

    /// Return `places` in the same order with distance fields filled in
    /// DOCUMENTATION: Never drops a place and never fails. Without an
    /// origin every distance field is cleared. When the road method is not
    /// applicable or fails in any way, distances come from haversine and
    /// `duration_text` stays empty.
    pub async fn enrich(
        &self,
        origin: Option<Coordinate>,
        places: &[Place],
        use_network_method: bool,
    ) -> Vec<Place> {
        let origin = match origin {
            Some(origin) => origin,
            None => {
                log::debug!("No origin, leaving {} places without distances", places.len());
                return places.iter().map(Place::without_distance).collect();
            }
        };

        if use_network_method && !places.is_empty() {
            if let Some(road) = &self.road {
                match self.road_enrich(road.as_ref(), origin, places).await {
                    Ok(enriched) => return enriched,
                    Err(e) => {
                        log::warn!("Road distance unavailable, using great-circle: {}", e);
                    }
                }
            }
        }

        Self::great_circle_enrich(origin, places)
    }

    async fn road_enrich(
        &self,
        road: &dyn RoadDistanceProvider,
        origin: Coordinate,
        places: &[Place],
    ) -> Result<Vec<Place>, LocatorError> {
        let destinations: Vec<Coordinate> = places.iter().map(|p| p.position).collect();

        let distances = tokio::time::timeout(self.timeout, road.road_distances(origin, &destinations))
            .await
            .map_err(|_| LocatorError::Enrichment(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| match e {
                LocatorError::Enrichment(_) => e,
                other => LocatorError::Enrichment(other.to_string()),
            })?;

        if distances.len() != places.len() {
            return Err(LocatorError::Enrichment(format!(
                "expected {} distances, got {}",
                places.len(),
                distances.len()
            )));
        }

        Ok(places
            .iter()
            .zip(distances)
            .map(|(place, d)| place.with_distance(d.meters, d.distance_text, Some(d.duration_text)))
            .collect())
    }

    fn great_circle_enrich(origin: Coordinate, places: &[Place]) -> Vec<Place> {
        places
            .iter()
            .map(|place| {
                let meters = origin.haversine_distance(&place.position);
                place.with_distance(meters, format_distance(meters), None)
            })
            .collect()
    }
}

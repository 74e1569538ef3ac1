// src/services/place_query.rs
// DOCUMENTATION: Place query service
// PURPOSE: One nearby search per call, truncated to the result cap, no caching

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::LocatorError;
use crate::models::{Coordinate, Place};

/// Provider side of nearby search
#[async_trait]
pub trait NearbySearch: Send + Sync {
    async fn nearby_search(
        &self,
        center: Coordinate,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<Place>, LocatorError>;
}

/// Nearby place lookup used by the viewport controller
#[derive(Clone)]
pub struct PlaceQueryService {
    provider: Arc<dyn NearbySearch>,
}

impl PlaceQueryService {
    pub fn new(provider: Arc<dyn NearbySearch>) -> Self {
        Self { provider }
    }

    /// Fetch up to `limit` places of `category` around `center`
    /// DOCUMENTATION: Provider order is kept as-is. Every call is a fresh
    /// request. Rate limiting and malformed payloads surface as errors
    /// for the caller to treat as a failed cycle.
    pub async fn fetch_nearby(
        &self,
        center: Coordinate,
        radius_m: u32,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Place>, LocatorError> {
        let mut places = self
            .provider
            .nearby_search(center, radius_m, category)
            .await
            .map_err(|e| match e {
                LocatorError::ProviderQuery(_) | LocatorError::RateLimitExceeded => e,
                other => LocatorError::ProviderQuery(other.to_string()),
            })?;

        if places.len() > limit {
            log::debug!("Truncating {} places to limit {}", places.len(), limit);
            places.truncate(limit);
        }

        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    struct FixedSearch {
        result: Result<Vec<Place>, LocatorError>,
        calls: Mutex<Vec<(Coordinate, u32, String)>>,
    }

    #[async_trait]
    impl NearbySearch for FixedSearch {
        async fn nearby_search(
            &self,
            center: Coordinate,
            radius_m: u32,
            category: &str,
        ) -> Result<Vec<Place>, LocatorError> {
            self.calls
                .lock()
                .unwrap()
                .push((center, radius_m, category.to_string()));
            self.result.clone()
        }
    }

    fn places(n: usize) -> Vec<Place> {
        (0..n)
            .map(|i| Place::new(format!("id{}", i), format!("S{}", i), Coordinate::new(1.0, i as f64)))
            .collect()
    }

    #[tokio::test]
    async fn test_truncates_preserving_order() {
        let provider = Arc::new(FixedSearch {
            result: Ok(places(60)),
            calls: Mutex::new(Vec::new()),
        });
        let service = PlaceQueryService::new(provider.clone());

        let result = assert_ok!(
            service
                .fetch_nearby(Coordinate::new(39.8, -98.5), 5000, "gas_station", 50)
                .await
        );

        assert_eq!(result.len(), 50);
        assert_eq!(result[0].id, "id0");
        assert_eq!(result[49].id, "id49");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, 5000);
        assert_eq!(calls[0].2, "gas_station");
    }

    #[tokio::test]
    async fn test_short_result_untouched() {
        let provider = Arc::new(FixedSearch {
            result: Ok(places(3)),
            calls: Mutex::new(Vec::new()),
        });
        let service = PlaceQueryService::new(provider);

        let result = service
            .fetch_nearby(Coordinate::new(0.0, 0.0), 1000, "gas_station", 50)
            .await
            .unwrap();
        assert_eq!(result, places(3));
    }

    #[tokio::test]
    async fn test_errors_become_provider_query_errors() {
        let provider = Arc::new(FixedSearch {
            result: Err(LocatorError::ServiceUnavailable),
            calls: Mutex::new(Vec::new()),
        });
        let service = PlaceQueryService::new(provider);

        let err = service
            .fetch_nearby(Coordinate::new(0.0, 0.0), 1000, "gas_station", 50)
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::ProviderQuery(_)));
    }
}

// src/models/place.rs
// DOCUMENTATION: Core data structures for places
// PURPOSE: Place record returned by nearby search and augmented by distance enrichment

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A point of interest near the viewport center
/// DOCUMENTATION: `id`, `name` and `position` come from the provider and are
/// never changed after the query. The three distance fields stay `None`
/// until enrichment fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Stable provider-issued identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Short address
    pub vicinity: Option<String>,

    /// Provider rating (0-5)
    pub rating: Option<f32>,

    /// Geographic location
    pub position: Coordinate,

    /// Distance from the user's position in meters
    pub distance_meters: Option<f64>,

    /// Human readable distance ("850 m", "2.4 km")
    pub distance_text: Option<String>,

    /// Human readable travel time, only from the road-network method
    pub duration_text: Option<String>,
}

impl Place {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vicinity: None,
            rating: None,
            position,
            distance_meters: None,
            distance_text: None,
            duration_text: None,
        }
    }

    /// Copy of this place with the distance fields replaced
    pub fn with_distance(
        &self,
        meters: f64,
        distance_text: String,
        duration_text: Option<String>,
    ) -> Self {
        Self {
            distance_meters: Some(meters),
            distance_text: Some(distance_text),
            duration_text,
            ..self.clone()
        }
    }

    /// Copy of this place with all distance fields cleared
    pub fn without_distance(&self) -> Self {
        Self {
            distance_meters: None,
            distance_text: None,
            duration_text: None,
            ..self.clone()
        }
    }
}

/// Paginated station list
/// DOCUMENTATION: Response format for GET /stations
#[derive(Debug, Serialize)]
pub struct StationListResponse {
    /// Places on this page, in provider order
    pub places: Vec<Place>,

    /// Total number of places in the current result set
    pub total: i64,

    /// Current page (1-based)
    pub page: i64,

    /// Results per page
    pub per_page: i64,

    /// Total pages
    pub total_pages: i64,

    /// Refresh cycle that produced this list
    pub epoch: u64,
}

impl StationListResponse {
    /// Slice one page out of the current result set
    pub fn paginate(places: &[Place], page: Option<i64>, per_page: Option<i64>, epoch: u64) -> Self {
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let page = page.unwrap_or(1).max(1);
        let total = places.len() as i64;
        let total_pages = (total as f64 / per_page as f64).ceil() as i64;

        // Pages past the end, or with an overflowing offset, are empty
        let start = (page - 1)
            .checked_mul(per_page)
            .and_then(|offset| usize::try_from(offset).ok())
            .filter(|&start| start < places.len());
        let page_places = match start {
            Some(start) => {
                let end = start.saturating_add(per_page as usize).min(places.len());
                places[start..end].to_vec()
            }
            None => Vec::new(),
        };

        Self {
            places: page_places,
            total,
            page,
            per_page,
            total_pages,
            epoch,
        }
    }
}

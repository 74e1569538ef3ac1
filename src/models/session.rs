// src/models/session.rs
// DOCUMENTATION: Request DTOs for the session and station endpoints
// PURPOSE: Input validation for everything the HTTP shell feeds into the sync core

use serde::Deserialize;
use validator::Validate;

use super::Coordinate;

/// Body for center, settle and position endpoints
#[derive(Debug, Deserialize, Validate)]
pub struct CoordinateRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl CoordinateRequest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Body for POST /session/map/settle
/// DOCUMENTATION: A pan ending at `lat`/`lng`, optionally followed by a zoom
#[derive(Debug, Deserialize, Validate)]
pub struct SettleRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,

    #[validate(range(min = 1, max = 21))]
    pub zoom: Option<u8>,
}

impl SettleRequest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Body for POST /session/position/error
/// DOCUMENTATION: `code` uses the browser numbering
/// (1 denied, 2 unavailable, 3 timeout); anything else is unknown.
#[derive(Debug, Deserialize, Validate)]
pub struct PositionErrorRequest {
    pub code: u16,

    #[validate(length(max = 500))]
    pub message: Option<String>,
}

/// Body for PUT /session/selection; a missing id clears the selection
#[derive(Debug, Deserialize, Validate)]
pub struct SelectionRequest {
    #[validate(length(min = 1, max = 255))]
    pub id: Option<String>,
}

/// Query string for GET /stations
#[derive(Debug, Deserialize)]
pub struct StationListQuery {
    /// Page number (1-based)
    pub page: Option<i64>,

    /// Results per page (max 100)
    pub per_page: Option<i64>,
}

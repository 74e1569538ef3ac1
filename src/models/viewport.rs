// src/models/viewport.rs
// DOCUMENTATION: Viewport and session state shapes
// PURPOSE: What the viewport controller owns and what it publishes to the shell

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{Coordinate, Place};

/// Center and radius the current query is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub center: Coordinate,
    pub radius_meters: u32,
}

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerPhase {
    Uninitialized,
    AwaitingCapability,
    Idle,
    Fetching,
    Error,
}

/// Published view of the controller state
/// DOCUMENTATION: Cloned out of a `watch` channel by the HTTP shell and
/// tests. `places` is the last successfully applied result set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: ControllerPhase,
    pub epoch: u64,
    pub viewport: Option<ViewportState>,
    pub origin: Option<Coordinate>,
    #[serde(skip)]
    pub places: Arc<Vec<Place>>,
    pub place_count: usize,
    pub selected_id: Option<String>,
    /// User-facing message of the last failed cycle, cleared on success
    pub last_error: Option<String>,
    /// Results dropped because a newer cycle had started
    pub stale_results: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: ControllerPhase::Uninitialized,
            epoch: 0,
            viewport: None,
            origin: None,
            places: Arc::new(Vec::new()),
            place_count: 0,
            selected_id: None,
            last_error: None,
            stale_results: 0,
            updated_at: Utc::now(),
        }
    }
}

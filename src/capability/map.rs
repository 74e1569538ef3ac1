// src/capability/map.rs
// DOCUMENTATION: Map capability seam
// PURPOSE: The operations the sync core needs from a map engine, nothing more

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::LocatorError;
use crate::models::Coordinate;

/// Capability-side marker handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Idle listener registration handle
pub type ListenerId = u64;

/// Callback invoked by the map engine (idle, marker click)
pub type MapCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Place,
    UserPosition,
}

/// What to draw for a new marker
#[derive(Debug, Clone)]
pub struct MarkerSpec {
    pub kind: MarkerKind,
    pub position: Coordinate,
    pub title: String,
    /// Place id for place markers
    pub tag: Option<String>,
}

/// Options passed when the map is created
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub zoom: u8,
    pub disable_default_ui: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            zoom: 13,
            disable_default_ui: false,
        }
    }
}

/// Loaded map capability: creates the map instance
pub trait MapProvider: Send + Sync {
    fn create_map(
        &self,
        container: &str,
        initial_center: Coordinate,
        options: &MapOptions,
    ) -> Result<Arc<dyn MapHandle>, LocatorError>;
}

/// A live map instance
/// DOCUMENTATION: Idle listeners fire after every pan/zoom settles,
/// including pans started by `pan_to`. Marker and info-surface calls are
/// only made by the marker manager.
pub trait MapHandle: Send + Sync {
    fn pan_to(&self, center: Coordinate);
    fn get_center(&self) -> Coordinate;

    fn add_idle_listener(&self, callback: MapCallback) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);

    fn create_marker(&self, spec: MarkerSpec, on_click: Option<MapCallback>) -> MarkerId;
    fn set_marker_position(&self, id: MarkerId, position: Coordinate);
    /// `Some(d)` starts a highlight that clears itself after `d`; `None` clears it now
    fn set_marker_highlight(&self, id: MarkerId, duration: Option<Duration>);
    fn remove_marker(&self, id: MarkerId);

    /// Open the single shared info surface on a marker, moving it if already open
    fn open_info_surface(&self, anchor: MarkerId, content: &str);
    fn close_info_surface(&self);
}

/// External SDK that yields a map provider once loaded
#[async_trait]
pub trait MapSdk: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn MapProvider>, LocatorError>;
}

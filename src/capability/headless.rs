// src/capability/headless.rs
// DOCUMENTATION: In-memory map capability
// PURPOSE: Map engine without a screen, used by the HTTP shell and by tests

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::map::{
    ListenerId, MapCallback, MapHandle, MapOptions, MapProvider, MapSdk, MarkerId, MarkerKind,
    MarkerSpec,
};
use crate::errors::LocatorError;
use crate::models::Coordinate;

type SharedCallback = Arc<dyn Fn() + Send + Sync>;

struct HeadlessMarker {
    kind: MarkerKind,
    position: Coordinate,
    title: String,
    tag: Option<String>,
    highlight_until: Option<Instant>,
    on_click: Option<SharedCallback>,
}

/// Read-only view of a marker
#[derive(Debug, Clone, Serialize)]
pub struct MarkerView {
    pub id: MarkerId,
    pub kind: MarkerKind,
    pub position: Coordinate,
    pub title: String,
    pub tag: Option<String>,
    pub highlighted: bool,
}

/// Open info surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoSurface {
    pub anchor: MarkerId,
    pub content: String,
}

/// Point-in-time summary of a headless map
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStats {
    pub container: String,
    pub center: Coordinate,
    pub zoom: u8,
    pub default_ui: bool,
    pub marker_count: usize,
    pub listener_count: usize,
    pub created_total: u64,
    pub removed_total: u64,
    pub info_surface: Option<InfoSurface>,
}

struct HeadlessState {
    container: String,
    center: Coordinate,
    zoom: u8,
    default_ui: bool,
    next_listener: ListenerId,
    listeners: Vec<(ListenerId, SharedCallback)>,
    markers: HashMap<MarkerId, HeadlessMarker>,
    info: Option<InfoSurface>,
    created_total: u64,
    removed_total: u64,
}

/// Map instance kept entirely in memory
/// DOCUMENTATION: Behaves like an interactive map as far as the sync core
/// can tell: panning (programmatic or `drag_to`) fires idle listeners,
/// and `click_marker` runs the marker's click callback. Callbacks always run
/// outside the internal lock.
pub struct HeadlessMap {
    state: Mutex<HeadlessState>,
}

impl HeadlessMap {
    fn new(container: &str, center: Coordinate, options: &MapOptions) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                container: container.to_string(),
                center,
                zoom: options.zoom,
                default_ui: !options.disable_default_ui,
                next_listener: 1,
                listeners: Vec::new(),
                markers: HashMap::new(),
                info: None,
                created_total: 0,
                removed_total: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        // A panicking callback never runs under the lock, so poisoning only
        // means a test thread died; the state itself is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fire_idle(&self) {
        let listeners: Vec<SharedCallback> =
            self.lock().listeners.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for listener in listeners {
            listener();
        }
    }

    /// Simulate a user pan ending at `center`
    pub fn drag_to(&self, center: Coordinate) {
        self.lock().center = center;
        self.fire_idle();
    }

    /// Simulate a zoom gesture; the map fires idle afterwards
    pub fn zoom_to(&self, zoom: u8) {
        self.lock().zoom = zoom;
        self.fire_idle();
    }

    /// Simulate a click; false when the marker does not exist
    pub fn click_marker(&self, id: MarkerId) -> bool {
        let callback = match self.lock().markers.get(&id) {
            Some(marker) => marker.on_click.clone(),
            None => return false,
        };
        if let Some(cb) = callback {
            cb();
        }
        true
    }

    pub fn find_marker_by_tag(&self, tag: &str) -> Option<MarkerId> {
        self.lock()
            .markers
            .iter()
            .find(|(_, m)| m.tag.as_deref() == Some(tag))
            .map(|(id, _)| *id)
    }

    pub fn markers(&self) -> Vec<MarkerView> {
        let now = Instant::now();
        let state = self.lock();
        let mut views: Vec<MarkerView> = state
            .markers
            .iter()
            .map(|(id, m)| MarkerView {
                id: *id,
                kind: m.kind,
                position: m.position,
                title: m.title.clone(),
                tag: m.tag.clone(),
                highlighted: m.highlight_until.map_or(false, |until| until > now),
            })
            .collect();
        views.sort_by(|a, b| a.title.cmp(&b.title));
        views
    }

    #[cfg(test)]
    pub fn marker_count(&self) -> usize {
        self.lock().markers.len()
    }

    #[cfg(test)]
    pub fn created_total(&self) -> u64 {
        self.lock().created_total
    }

    #[cfg(test)]
    pub fn removed_total(&self) -> u64 {
        self.lock().removed_total
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    #[cfg(test)]
    pub fn info_surface(&self) -> Option<InfoSurface> {
        self.lock().info.clone()
    }

    pub fn stats(&self) -> MapStats {
        let state = self.lock();
        MapStats {
            container: state.container.clone(),
            center: state.center,
            zoom: state.zoom,
            default_ui: state.default_ui,
            marker_count: state.markers.len(),
            listener_count: state.listeners.len(),
            created_total: state.created_total,
            removed_total: state.removed_total,
            info_surface: state.info.clone(),
        }
    }

    pub fn container(&self) -> String {
        self.lock().container.clone()
    }

    pub fn zoom(&self) -> u8 {
        self.lock().zoom
    }
}

impl MapHandle for HeadlessMap {
    fn pan_to(&self, center: Coordinate) {
        self.drag_to(center);
    }

    fn get_center(&self) -> Coordinate {
        self.lock().center
    }

    fn add_idle_listener(&self, callback: MapCallback) -> ListenerId {
        let mut state = self.lock();
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.push((id, Arc::from(callback)));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.lock().listeners.retain(|(lid, _)| *lid != id);
    }

    fn create_marker(&self, spec: MarkerSpec, on_click: Option<MapCallback>) -> MarkerId {
        let id = MarkerId::new();
        let mut state = self.lock();
        state.markers.insert(
            id,
            HeadlessMarker {
                kind: spec.kind,
                position: spec.position,
                title: spec.title,
                tag: spec.tag,
                highlight_until: None,
                on_click: on_click.map(Arc::from),
            },
        );
        state.created_total += 1;
        id
    }

    fn set_marker_position(&self, id: MarkerId, position: Coordinate) {
        if let Some(marker) = self.lock().markers.get_mut(&id) {
            marker.position = position;
        }
    }

    fn set_marker_highlight(&self, id: MarkerId, duration: Option<Duration>) {
        if let Some(marker) = self.lock().markers.get_mut(&id) {
            marker.highlight_until = duration.map(|d| Instant::now() + d);
        }
    }

    fn remove_marker(&self, id: MarkerId) {
        let mut state = self.lock();
        if state.markers.remove(&id).is_some() {
            state.removed_total += 1;
        }
    }

    fn open_info_surface(&self, anchor: MarkerId, content: &str) {
        self.lock().info = Some(InfoSurface {
            anchor,
            content: content.to_string(),
        });
    }

    fn close_info_surface(&self) {
        self.lock().info = None;
    }
}

/// Provider that hands out one headless map
pub struct HeadlessProvider {
    map: Mutex<Option<Arc<HeadlessMap>>>,
}

impl HeadlessProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            map: Mutex::new(None),
        })
    }

    /// The map instance, once created
    pub fn map(&self) -> Option<Arc<HeadlessMap>> {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl MapProvider for HeadlessProvider {
    fn create_map(
        &self,
        container: &str,
        initial_center: Coordinate,
        options: &MapOptions,
    ) -> Result<Arc<dyn MapHandle>, LocatorError> {
        let mut slot = self.map.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.clone() {
            // Singleton: re-center instead of recreating
            drop(slot);
            log::warn!("Map already created in '{}', re-centering", existing.container());
            existing.pan_to(initial_center);
            return Ok(existing);
        }

        log::info!("Creating headless map in '{}' at {}", container, initial_center);
        let map = Arc::new(HeadlessMap::new(container, initial_center, options));
        *slot = Some(Arc::clone(&map));
        Ok(map)
    }
}

/// SDK stand-in that "loads" a headless provider
pub struct HeadlessSdk {
    provider: Arc<HeadlessProvider>,
    delay: Duration,
    failure: Option<String>,
}

impl HeadlessSdk {
    pub fn new(provider: Arc<HeadlessProvider>) -> Self {
        Self {
            provider,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    #[cfg(test)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[cfg(test)]
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }
}

#[async_trait]
impl MapSdk for HeadlessSdk {
    async fn load(&self) -> Result<Arc<dyn MapProvider>, LocatorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(reason) => Err(LocatorError::CapabilityLoad(reason.clone())),
            None => Ok(Arc::clone(&self.provider) as Arc<dyn MapProvider>),
        }
    }
}

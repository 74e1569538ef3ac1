// src/sync/markers.rs
// DOCUMENTATION: Marker lifecycle manager
// PURPOSE: Keep map markers in step with the latest enriched result set and selection

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::capability::{MapHandle, MarkerId, MarkerKind, MarkerSpec};
use crate::models::{Coordinate, Place};

/// Caller-supplied selection callback
pub type SelectionCallback = Arc<dyn Fn(&Place) + Send + Sync>;

/// Where marker clicks are forwarded (place id)
pub type ClickSink = Arc<dyn Fn(String) + Send + Sync>;

struct TrackedMarker {
    handle: MarkerId,
    place: Place,
}

/// Sole owner of markers and the shared info surface
/// DOCUMENTATION: Place markers are keyed by place id; the user position
/// marker is a separate singleton slot. Nothing else may touch markers on
/// the map.
pub struct MarkerManager {
    map: Arc<dyn MapHandle>,
    markers: HashMap<String, TrackedMarker>,
    user_marker: Option<MarkerId>,
    info_anchor: Option<String>,
    on_select: SelectionCallback,
    click_sink: ClickSink,
    highlight: Duration,
}

impl MarkerManager {
    pub fn new(
        map: Arc<dyn MapHandle>,
        on_select: SelectionCallback,
        click_sink: ClickSink,
        highlight: Duration,
    ) -> Self {
        Self {
            map,
            markers: HashMap::new(),
            user_marker: None,
            info_anchor: None,
            on_select,
            click_sink,
            highlight,
        }
    }

    /// Converge the marker set on `places` and apply the selection highlight
    pub fn reconcile(&mut self, places: &[Place], selected_id: Option<&str>) {
        let target: HashSet<&str> = places.iter().map(|p| p.id.as_str()).collect();

        let map = &self.map;
        let mut removed = Vec::new();
        self.markers.retain(|id, marker| {
            if target.contains(id.as_str()) {
                return true;
            }
            map.remove_marker(marker.handle);
            removed.push(id.clone());
            false
        });

        if let Some(anchor) = &self.info_anchor {
            if removed.contains(anchor) {
                self.map.close_info_surface();
                self.info_anchor = None;
            }
        }

        let mut created = 0usize;
        for place in places {
            match self.markers.get_mut(&place.id) {
                Some(marker) => {
                    self.map.set_marker_position(marker.handle, place.position);
                    marker.place = place.clone();
                }
                None => {
                    let handle = self.create_place_marker(place);
                    self.markers.insert(
                        place.id.clone(),
                        TrackedMarker {
                            handle,
                            place: place.clone(),
                        },
                    );
                    created += 1;
                }
            }
        }

        for (id, marker) in &self.markers {
            let highlight = match selected_id {
                Some(selected) if selected == id => Some(self.highlight),
                _ => None,
            };
            self.map.set_marker_highlight(marker.handle, highlight);
        }

        log::debug!(
            "Markers reconciled: {} live, {} created, {} removed",
            self.markers.len(),
            created,
            removed.len()
        );
    }

    fn create_place_marker(&self, place: &Place) -> MarkerId {
        let sink = Arc::clone(&self.click_sink);
        let place_id = place.id.clone();

        self.map.create_marker(
            MarkerSpec {
                kind: MarkerKind::Place,
                position: place.position,
                title: place.name.clone(),
                tag: Some(place.id.clone()),
            },
            Some(Box::new(move || sink(place_id.clone()))),
        )
    }

    /// Create, move or remove the user position marker
    pub fn sync_user_position(&mut self, position: Option<Coordinate>) {
        match (position, self.user_marker) {
            (Some(pos), Some(handle)) => self.map.set_marker_position(handle, pos),
            (Some(pos), None) => {
                let handle = self.map.create_marker(
                    MarkerSpec {
                        kind: MarkerKind::UserPosition,
                        position: pos,
                        title: "Your location".to_string(),
                        tag: None,
                    },
                    None,
                );
                self.user_marker = Some(handle);
            }
            (None, Some(handle)) => {
                self.map.remove_marker(handle);
                self.user_marker = None;
            }
            (None, None) => {}
        }
    }

    /// A marker was clicked: notify the caller and open the info surface
    pub fn handle_click(&mut self, place_id: &str) -> Option<Place> {
        let marker = match self.markers.get(place_id) {
            Some(marker) => marker,
            None => {
                log::debug!("Click on unknown marker {}", place_id);
                return None;
            }
        };

        (self.on_select)(&marker.place);
        self.map
            .open_info_surface(marker.handle, &info_content(&marker.place));
        self.info_anchor = Some(place_id.to_string());

        Some(marker.place.clone())
    }

    #[cfg(test)]
    pub fn handle_for(&self, place_id: &str) -> Option<MarkerId> {
        self.markers.get(place_id).map(|m| m.handle)
    }

    #[cfg(test)]
    pub fn live_ids(&self) -> HashSet<String> {
        self.markers.keys().cloned().collect()
    }

    #[cfg(test)]
    pub fn has_user_marker(&self) -> bool {
        self.user_marker.is_some()
    }

    /// Destroy every marker and close the info surface
    pub fn clear(&mut self) {
        for (_, marker) in self.markers.drain() {
            self.map.remove_marker(marker.handle);
        }
        if let Some(handle) = self.user_marker.take() {
            self.map.remove_marker(handle);
        }
        if self.info_anchor.take().is_some() {
            self.map.close_info_surface();
        }
    }
}

fn info_content(place: &Place) -> String {
    let mut lines = vec![place.name.clone()];
    if let Some(vicinity) = &place.vicinity {
        lines.push(vicinity.clone());
    }
    match (&place.distance_text, &place.duration_text) {
        (Some(distance), Some(duration)) => lines.push(format!("{} · {}", distance, duration)),
        (Some(distance), None) => lines.push(distance.clone()),
        _ => {}
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{HeadlessMap, HeadlessProvider, MapOptions, MapProvider};
    use std::sync::Mutex;

    struct Fixture {
        map: Arc<HeadlessMap>,
        manager: MarkerManager,
        selected: Arc<Mutex<Vec<String>>>,
        clicks: Arc<Mutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let provider = HeadlessProvider::new();
        let handle = provider
            .create_map("map", Coordinate::new(39.8283, -98.5795), &MapOptions::default())
            .unwrap();
        let map = provider.map().unwrap();

        let selected = Arc::new(Mutex::new(Vec::new()));
        let clicks = Arc::new(Mutex::new(Vec::new()));

        let selected_log = Arc::clone(&selected);
        let click_log = Arc::clone(&clicks);
        let manager = MarkerManager::new(
            handle,
            Arc::new(move |p: &Place| selected_log.lock().unwrap().push(p.id.clone())),
            Arc::new(move |id: String| click_log.lock().unwrap().push(id)),
            Duration::from_secs(60),
        );

        Fixture {
            map,
            manager,
            selected,
            clicks,
        }
    }

    fn place(id: &str, lat: f64) -> Place {
        Place::new(id, format!("Station {}", id), Coordinate::new(lat, -98.5))
    }

    #[test]
    fn test_converges_and_keeps_shared_handles() {
        let mut fx = fixture();

        let set_a = vec![place("a", 39.1), place("b", 39.2), place("c", 39.3)];
        fx.manager.reconcile(&set_a, None);
        let b_handle = fx.manager.handle_for("b").unwrap();
        let c_handle = fx.manager.handle_for("c").unwrap();

        let set_b = vec![place("b", 39.25), place("c", 39.3), place("d", 39.4)];
        fx.manager.reconcile(&set_b, None);

        let expected: HashSet<String> = ["b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fx.manager.live_ids(), expected);
        assert_eq!(fx.manager.handle_for("b"), Some(b_handle));
        assert_eq!(fx.manager.handle_for("c"), Some(c_handle));
        assert!(fx.manager.handle_for("a").is_none());

        assert_eq!(fx.map.marker_count(), 3);
        assert_eq!(fx.map.created_total(), 4);
        assert_eq!(fx.map.removed_total(), 1);

        let moved = fx.map.markers().into_iter().find(|m| m.id == b_handle).unwrap();
        assert_eq!(moved.position, Coordinate::new(39.25, -98.5));
    }

    #[test]
    fn test_only_selected_marker_highlighted() {
        let mut fx = fixture();
        let places = vec![place("a", 39.1), place("b", 39.2)];

        fx.manager.reconcile(&places, Some("a"));
        let highlighted: Vec<_> = fx.map.markers().into_iter().filter(|m| m.highlighted).collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].tag.as_deref(), Some("a"));

        fx.manager.reconcile(&places, Some("b"));
        let highlighted: Vec<_> = fx.map.markers().into_iter().filter(|m| m.highlighted).collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].tag.as_deref(), Some("b"));

        fx.manager.reconcile(&places, None);
        assert!(fx.map.markers().iter().all(|m| !m.highlighted));
    }

    #[test]
    fn test_user_marker_follows_position() {
        let mut fx = fixture();

        fx.manager.sync_user_position(Some(Coordinate::new(39.0, -98.0)));
        fx.manager.sync_user_position(Some(Coordinate::new(39.5, -98.0)));
        assert!(fx.manager.has_user_marker());
        assert_eq!(fx.map.created_total(), 1);

        let user = fx.map.markers().into_iter().find(|m| m.kind == MarkerKind::UserPosition).unwrap();
        assert_eq!(user.position, Coordinate::new(39.5, -98.0));

        // Place reconciles never touch the user marker
        fx.manager.reconcile(&[], None);
        assert_eq!(fx.map.marker_count(), 1);

        fx.manager.sync_user_position(None);
        assert!(!fx.manager.has_user_marker());
        assert_eq!(fx.map.marker_count(), 0);
    }

    #[test]
    fn test_click_selects_and_moves_info_surface() {
        let mut fx = fixture();
        let places = vec![
            place("a", 39.1).with_distance(850.0, "850 m".to_string(), Some("2 mins".to_string())),
            place("b", 39.2),
        ];
        fx.manager.reconcile(&places, None);

        // The map forwards the click to the sink
        let a_handle = fx.manager.handle_for("a").unwrap();
        assert!(fx.map.click_marker(a_handle));
        assert_eq!(*fx.clicks.lock().unwrap(), vec!["a".to_string()]);

        fx.manager.handle_click("a");
        let info = fx.map.info_surface().unwrap();
        assert_eq!(info.anchor, a_handle);
        assert!(info.content.contains("850 m · 2 mins"));

        fx.manager.handle_click("b");
        let info = fx.map.info_surface().unwrap();
        assert_eq!(info.anchor, fx.manager.handle_for("b").unwrap());
        assert_eq!(*fx.selected.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);

        assert!(fx.manager.handle_click("missing").is_none());
    }

    #[test]
    fn test_info_surface_closed_when_anchor_removed() {
        let mut fx = fixture();
        fx.manager.reconcile(&[place("a", 39.1), place("b", 39.2)], None);
        fx.manager.handle_click("a");
        assert!(fx.map.info_surface().is_some());

        fx.manager.reconcile(&[place("b", 39.2)], None);
        assert!(fx.map.info_surface().is_none());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut fx = fixture();
        fx.manager.sync_user_position(Some(Coordinate::new(39.0, -98.0)));
        fx.manager.reconcile(&[place("a", 39.1), place("b", 39.2)], None);
        fx.manager.handle_click("b");

        fx.manager.clear();
        assert_eq!(fx.map.marker_count(), 0);
        assert!(fx.map.info_surface().is_none());
        assert!(fx.manager.live_ids().is_empty());
    }
}

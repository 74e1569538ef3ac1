// src/sync/controller.rs
// DOCUMENTATION: Viewport synchronization controller
// PURPOSE: Own the authoritative center, debounce map settles, and drive epoch-tagged fetch+enrich cycles

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::debounce::{wait_until, Debouncer};
use super::markers::{MarkerManager, SelectionCallback};
use crate::capability::{
    CapabilityLoader, GeoPositionProvider, GeoSnapshot, ListenerId, MapHandle, MapOptions,
    MapProvider,
};
use crate::config::Config;
use crate::errors::LocatorError;
use crate::models::{
    Coordinate, ControllerPhase, Place, SessionSnapshot, ViewportState, CENTER_EPSILON,
};
use crate::services::{DistanceEnricher, PlaceQueryService};

/// Tunables for one controller instance
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub category: String,
    pub radius_m: u32,
    pub limit: usize,
    pub settle_debounce: Duration,
    pub geolocation_grace: Duration,
    pub default_center: Coordinate,
    pub center_epsilon: f64,
    pub use_network_method: bool,
    pub highlight: Duration,
    pub map_container: String,
    pub map_options: MapOptions,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            category: config.place_category.clone(),
            radius_m: config.search_radius_m,
            limit: config.result_limit,
            settle_debounce: config.settle_debounce(),
            geolocation_grace: config.geolocation_grace(),
            default_center: config.default_center,
            center_epsilon: CENTER_EPSILON,
            use_network_method: config.use_distance_matrix(),
            highlight: config.highlight(),
            map_container: "map".to_string(),
            map_options: MapOptions {
                zoom: config.map_zoom,
                ..MapOptions::default()
            },
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            category: "gas_station".to_string(),
            radius_m: 5000,
            limit: 50,
            settle_debounce: Duration::from_millis(500),
            geolocation_grace: Duration::from_secs(5),
            default_center: Coordinate::new(39.8283, -98.5795),
            center_epsilon: CENTER_EPSILON,
            use_network_method: false,
            highlight: Duration::from_millis(1400),
            map_container: "map".to_string(),
            map_options: MapOptions::default(),
        }
    }
}

#[derive(Debug)]
enum Command {
    SetCenter(Coordinate),
    MapSettled,
    Select(Option<String>),
    MarkerClicked(String),
    Shutdown,
}

struct CycleOutcome {
    epoch: u64,
    result: Result<Vec<Place>, LocatorError>,
}

/// Cloneable front door to a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl ControllerHandle {
    fn send(&self, command: Command) -> Result<(), LocatorError> {
        self.commands
            .send(command)
            .map_err(|_| LocatorError::ServiceUnavailable)
    }

    /// Programmatic re-center; starts a cycle immediately, no debounce
    pub fn set_center(&self, center: Coordinate) -> Result<(), LocatorError> {
        if !center.is_valid() {
            return Err(LocatorError::InvalidInput(format!(
                "coordinate out of range: {}",
                center
            )));
        }
        self.send(Command::SetCenter(center))
    }

    pub fn select(&self, place_id: Option<String>) -> Result<(), LocatorError> {
        self.send(Command::Select(place_id))
    }

    /// Stop the controller; markers and listeners are released
    pub fn shutdown(&self) {
        let _ = self.send(Command::Shutdown);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }
}

/// The orchestrating actor
/// DOCUMENTATION: Runs as one tokio task and is the only owner of viewport
/// state, the map handle and the marker manager. Every cycle gets a fresh
/// epoch before anything is spawned; outcomes carrying an older epoch are
/// counted and dropped. In-flight cycles are never aborted.
///
/// The map idle listener and marker click callbacks hold command senders,
/// so the task runs until `ControllerHandle::shutdown`.
pub struct ViewportController {
    settings: SyncSettings,
    query: PlaceQueryService,
    enricher: DistanceEnricher,
    loader: Arc<CapabilityLoader>,
    on_select: SelectionCallback,

    phase: ControllerPhase,
    epoch: u64,
    viewport: Option<ViewportState>,
    origin: Option<Coordinate>,
    pending_center: Option<Coordinate>,
    provider: Option<Arc<dyn MapProvider>>,
    map: Option<Arc<dyn MapHandle>>,
    markers: Option<MarkerManager>,
    idle_listener: Option<ListenerId>,
    settle: Debouncer,
    grace: Debouncer,
    places: Arc<Vec<Place>>,
    selected: Option<String>,
    last_error: Option<String>,
    stale_results: u64,

    commands_tx: mpsc::UnboundedSender<Command>,
    outcomes_tx: mpsc::UnboundedSender<CycleOutcome>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl ViewportController {
    /// Start the controller task
    pub fn spawn(
        settings: SyncSettings,
        query: PlaceQueryService,
        enricher: DistanceEnricher,
        geo: Arc<GeoPositionProvider>,
        loader: Arc<CapabilityLoader>,
        on_select: SelectionCallback,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let geo_rx = geo.subscribe();

        let controller = ViewportController {
            settle: Debouncer::new(settings.settle_debounce),
            grace: Debouncer::new(settings.geolocation_grace),
            settings,
            query,
            enricher,
            loader,
            on_select,
            phase: ControllerPhase::Uninitialized,
            epoch: 0,
            viewport: None,
            origin: None,
            pending_center: None,
            provider: None,
            map: None,
            markers: None,
            idle_listener: None,
            places: Arc::new(Vec::new()),
            selected: None,
            last_error: None,
            stale_results: 0,
            commands_tx: commands_tx.clone(),
            outcomes_tx,
            snapshot_tx,
        };

        let task = tokio::spawn(controller.run(commands_rx, outcomes_rx, geo_rx));
        let handle = ControllerHandle {
            commands: commands_tx,
            snapshot: snapshot_rx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<CycleOutcome>,
        mut geo: watch::Receiver<GeoSnapshot>,
    ) {
        let loader = Arc::clone(&self.loader);
        let ready = loader.ready();
        tokio::pin!(ready);
        let mut awaiting_capability = true;
        let mut geo_open = true;

        self.grace.arm_once();
        self.transition(ControllerPhase::AwaitingCapability);

        let initial = geo.borrow_and_update().clone();
        self.on_geolocation(initial);

        loop {
            tokio::select! {
                result = &mut ready, if awaiting_capability => {
                    awaiting_capability = false;
                    self.on_capability(result);
                }
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(outcome) = outcomes.recv() => self.apply_outcome(outcome),
                changed = geo.changed(), if geo_open => match changed {
                    Ok(()) => {
                        let snapshot = geo.borrow_and_update().clone();
                        self.on_geolocation(snapshot);
                    }
                    Err(_) => geo_open = false,
                },
                _ = wait_until(self.settle.deadline()) => self.on_settle_quiet(),
                _ = wait_until(self.grace.deadline()) => self.on_grace_elapsed(),
            }
        }

        self.teardown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetCenter(center) => self.on_set_center(center),
            Command::MapSettled => {
                if self.map.is_some() {
                    self.settle.trigger();
                }
            }
            Command::Select(place_id) => self.on_select_changed(place_id),
            Command::MarkerClicked(place_id) => self.on_marker_clicked(place_id),
            Command::Shutdown => {}
        }
    }

    fn on_capability(&mut self, result: Result<Arc<dyn MapProvider>, LocatorError>) {
        match result {
            Ok(provider) => {
                self.provider = Some(provider);
                self.try_initialize();
            }
            Err(e) => {
                log::error!("Viewport sync disabled: {}", e);
                self.last_error = Some(e.user_message().to_string());
                self.grace.cancel();
                self.transition(ControllerPhase::Error);
            }
        }
    }

    fn on_geolocation(&mut self, snapshot: GeoSnapshot) {
        let previous = self.origin;
        self.origin = snapshot.coords;

        if let Some(markers) = self.markers.as_mut() {
            markers.sync_user_position(self.origin);
        }

        if self.map.is_none() && self.pending_center.is_none() {
            if let Some(coords) = snapshot.coords {
                self.pending_center = Some(coords);
            } else if let Some(err) = &snapshot.error {
                log::info!(
                    "No position ({}), using default center {}",
                    err,
                    self.settings.default_center
                );
                self.pending_center = Some(self.settings.default_center);
            }
            self.try_initialize();
        }

        if previous != self.origin {
            self.publish();
        }
    }

    fn on_grace_elapsed(&mut self) {
        if !self.grace.fire() {
            return;
        }
        if self.map.is_none() && self.pending_center.is_none() {
            log::info!(
                "No position within {:?}, using default center {}",
                self.settings.geolocation_grace,
                self.settings.default_center
            );
            self.pending_center = Some(self.settings.default_center);
            self.try_initialize();
        }
    }

    /// Create the map once both the capability and an initial center exist
    fn try_initialize(&mut self) {
        if self.map.is_some() {
            return;
        }
        let provider = match &self.provider {
            Some(provider) => Arc::clone(provider),
            None => return,
        };
        let center = match self.pending_center.take() {
            Some(center) => center,
            None => return,
        };

        let map = match provider.create_map(
            &self.settings.map_container,
            center,
            &self.settings.map_options,
        ) {
            Ok(map) => map,
            Err(e) => {
                log::error!("Failed to create map: {}", e);
                self.last_error = Some(e.user_message().to_string());
                self.transition(ControllerPhase::Error);
                return;
            }
        };

        self.grace.cancel();

        let settled = self.commands_tx.clone();
        self.idle_listener = Some(map.add_idle_listener(Box::new(move || {
            let _ = settled.send(Command::MapSettled);
        })));

        let clicks = self.commands_tx.clone();
        let mut markers = MarkerManager::new(
            Arc::clone(&map),
            Arc::clone(&self.on_select),
            Arc::new(move |place_id: String| {
                let _ = clicks.send(Command::MarkerClicked(place_id));
            }),
            self.settings.highlight,
        );
        markers.sync_user_position(self.origin);

        self.map = Some(map);
        self.markers = Some(markers);
        log::info!("Map initialized at {}", center);

        self.transition(ControllerPhase::Idle);
        self.start_cycle(center);
    }

    fn on_set_center(&mut self, center: Coordinate) {
        match &self.map {
            Some(map) => {
                map.pan_to(center);
                self.start_cycle(center);
            }
            None => {
                self.pending_center = Some(center);
                self.try_initialize();
            }
        }
    }

    /// Quiet window elapsed after the last settle event
    fn on_settle_quiet(&mut self) {
        if !self.settle.fire() {
            return;
        }
        let reported = match &self.map {
            Some(map) => map.get_center(),
            None => return,
        };

        match self.viewport {
            Some(viewport) if reported.approx_eq(&viewport.center, self.settings.center_epsilon) => {
                log::debug!("Map settled at current center, no fetch");
            }
            _ => self.start_cycle(reported),
        }
    }

    fn start_cycle(&mut self, center: Coordinate) {
        self.epoch += 1;
        let epoch = self.epoch;
        self.viewport = Some(ViewportState {
            center,
            radius_meters: self.settings.radius_m,
        });
        log::info!("Cycle {} started at {}", epoch, center);
        self.transition(ControllerPhase::Fetching);

        let query = self.query.clone();
        let enricher = self.enricher.clone();
        let origin = self.origin;
        let radius_m = self.settings.radius_m;
        let category = self.settings.category.clone();
        let limit = self.settings.limit;
        let use_network = self.settings.use_network_method;
        let outcomes = self.outcomes_tx.clone();

        tokio::spawn(async move {
            let result = match query.fetch_nearby(center, radius_m, &category, limit).await {
                Ok(places) => Ok(enricher.enrich(origin, &places, use_network).await),
                Err(e) => Err(e),
            };
            let _ = outcomes.send(CycleOutcome { epoch, result });
        });
    }

    fn apply_outcome(&mut self, outcome: CycleOutcome) {
        if outcome.epoch != self.epoch {
            self.stale_results += 1;
            log::debug!(
                "Discarding stale cycle {} (current {})",
                outcome.epoch,
                self.epoch
            );
            self.publish();
            return;
        }

        match outcome.result {
            Ok(places) => {
                log::info!("Cycle {} applied: {} places", outcome.epoch, places.len());
                if let Some(markers) = self.markers.as_mut() {
                    markers.reconcile(&places, self.selected.as_deref());
                }
                self.places = Arc::new(places);
                self.last_error = None;
                self.transition(ControllerPhase::Idle);
            }
            Err(e) => {
                if e.is_cycle_failure() {
                    log::warn!("Cycle {} failed: {}", outcome.epoch, e);
                } else {
                    log::error!("Cycle {} failed unexpectedly: {}", outcome.epoch, e);
                }
                self.last_error = Some(e.user_message().to_string());
                self.transition(ControllerPhase::Error);
                // Previous places stay on the map
                self.transition(ControllerPhase::Idle);
            }
        }
    }

    fn on_select_changed(&mut self, place_id: Option<String>) {
        self.selected = place_id;
        if let Some(markers) = self.markers.as_mut() {
            markers.reconcile(&self.places, self.selected.as_deref());
        }
        self.publish();
    }

    fn on_marker_clicked(&mut self, place_id: String) {
        let markers = match self.markers.as_mut() {
            Some(markers) => markers,
            None => return,
        };
        if markers.handle_click(&place_id).is_some() {
            self.selected = Some(place_id);
            markers.reconcile(&self.places, self.selected.as_deref());
            self.publish();
        }
    }

    fn teardown(&mut self) {
        if self.settle.is_pending() {
            log::debug!("Dropping pending settle event");
        }
        self.settle.cancel();
        self.grace.cancel();

        if let (Some(map), Some(listener)) = (&self.map, self.idle_listener.take()) {
            map.remove_listener(listener);
        }
        if let Some(markers) = self.markers.as_mut() {
            markers.clear();
        }

        log::info!("Viewport controller stopped after {} cycles", self.epoch);
        self.transition(ControllerPhase::Uninitialized);
    }

    fn transition(&mut self, phase: ControllerPhase) {
        if phase != self.phase {
            log::debug!("Controller phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            phase: self.phase,
            epoch: self.epoch,
            viewport: self.viewport,
            origin: self.origin,
            places: Arc::clone(&self.places),
            place_count: self.places.len(),
            selected_id: self.selected.clone(),
            last_error: self.last_error.clone(),
            stale_results: self.stale_results,
            updated_at: Utc::now(),
        });
    }
}

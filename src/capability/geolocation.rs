// src/capability/geolocation.rs
// DOCUMENTATION: User position provider
// PURPOSE: Hold the latest geolocation fix, permission state and error, and publish changes

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};

use crate::errors::LocatorError;
use crate::models::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Prompt,
    Granted,
    Denied,
    Unsupported,
}

/// Geolocation failure codes (browser codes 1-3 plus local ones)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeolocationErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Unknown,
}

impl GeolocationErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationErrorCode::PermissionDenied,
            2 => GeolocationErrorCode::PositionUnavailable,
            3 => GeolocationErrorCode::Timeout,
            _ => GeolocationErrorCode::Unknown,
        }
    }
}

/// Current geolocation view
#[derive(Debug, Clone)]
pub struct GeoSnapshot {
    pub coords: Option<Coordinate>,
    pub error: Option<LocatorError>,
    pub permission: PermissionState,
    pub refresh_requests: u64,
}

/// Position provider fed by the device side
/// DOCUMENTATION: A device adapter (browser bridge, HTTP shell, test) calls
/// `report_fix`/`report_error`; consumers read `snapshot()` or `subscribe()`.
/// An error clears the known position, so the origin becomes unknown.
pub struct GeoPositionProvider {
    state: watch::Sender<GeoSnapshot>,
    refresh: Notify,
}

impl GeoPositionProvider {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GeoSnapshot {
            coords: None,
            error: None,
            permission: PermissionState::Prompt,
            refresh_requests: 0,
        });
        Self {
            state,
            refresh: Notify::new(),
        }
    }

    pub fn report_fix(&self, coords: Coordinate) {
        log::debug!("Geolocation fix: {}", coords);
        self.state.send_modify(|s| {
            s.coords = Some(coords);
            s.error = None;
            s.permission = PermissionState::Granted;
        });
    }

    pub fn report_error(&self, code: GeolocationErrorCode, message: impl Into<String>) {
        let message = message.into();
        log::warn!("Geolocation error {:?}: {}", code, message);
        self.state.send_modify(|s| {
            s.coords = None;
            s.error = Some(LocatorError::Geolocation { code, message });
            match code {
                GeolocationErrorCode::PermissionDenied => s.permission = PermissionState::Denied,
                GeolocationErrorCode::Unsupported => s.permission = PermissionState::Unsupported,
                _ => {}
            }
        });
    }

    /// Ask the device side for a new fix
    pub fn refresh(&self) {
        self.state.send_modify(|s| {
            s.refresh_requests += 1;
            s.error = None;
        });
        self.refresh.notify_waiters();
    }

    /// Resolves on the next `refresh()` call
    pub async fn refresh_requested(&self) {
        self.refresh.notified().await
    }

    pub fn snapshot(&self) -> GeoSnapshot {
        self.state.borrow().clone()
    }

    pub fn coords(&self) -> Option<Coordinate> {
        self.state.borrow().coords
    }

    pub fn subscribe(&self) -> watch::Receiver<GeoSnapshot> {
        self.state.subscribe()
    }
}

impl Default for GeoPositionProvider {
    fn default() -> Self {
        Self::new()
    }
}

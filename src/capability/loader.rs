// src/capability/loader.rs
// DOCUMENTATION: Map capability loader
// PURPOSE: Acquire the map provider once, asynchronously, and expose its status

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use super::map::{MapProvider, MapSdk};
use crate::errors::LocatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapabilityStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Clone)]
struct LoaderState {
    status: CapabilityStatus,
    provider: Option<Arc<dyn MapProvider>>,
    error: Option<LocatorError>,
}

/// Singleton loader for the map capability
/// DOCUMENTATION: `load` is idempotent; only the first call reaches the SDK.
/// A load failure is terminal and reported once.
pub struct CapabilityLoader {
    state: watch::Sender<LoaderState>,
}

impl CapabilityLoader {
    pub fn new() -> Arc<Self> {
        let (state, _) = watch::channel(LoaderState {
            status: CapabilityStatus::Idle,
            provider: None,
            error: None,
        });
        Arc::new(Self { state })
    }

    /// Start loading in the background
    pub fn load(self: &Arc<Self>, sdk: Arc<dyn MapSdk>) {
        let started = self.state.send_if_modified(|s| {
            if s.status != CapabilityStatus::Idle {
                return false;
            }
            s.status = CapabilityStatus::Loading;
            true
        });

        if !started {
            log::debug!("Map capability load already requested");
            return;
        }

        log::info!("Loading map capability...");
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            let result = sdk.load().await;
            loader.state.send_modify(|s| match result {
                Ok(provider) => {
                    log::info!("Map capability ready");
                    s.status = CapabilityStatus::Ready;
                    s.provider = Some(provider);
                }
                Err(e) => {
                    log::error!("Map capability failed to load: {}", e);
                    s.status = CapabilityStatus::Error;
                    s.error = Some(match e {
                        LocatorError::CapabilityLoad(_) => e,
                        other => LocatorError::CapabilityLoad(other.to_string()),
                    });
                }
            });
        });
    }

    pub fn status(&self) -> CapabilityStatus {
        self.state.borrow().status
    }

    /// The provider, once ready
    pub fn handle(&self) -> Option<Arc<dyn MapProvider>> {
        self.state.borrow().provider.clone()
    }

    /// Wait until the capability is ready or has failed
    pub async fn ready(&self) -> Result<Arc<dyn MapProvider>, LocatorError> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| matches!(s.status, CapabilityStatus::Ready | CapabilityStatus::Error))
            .await
            .map_err(|_| LocatorError::CapabilityLoad("loader dropped".to_string()))?;

        match (&state.provider, &state.error) {
            (Some(provider), _) => Ok(Arc::clone(provider)),
            (None, Some(err)) => Err(err.clone()),
            (None, None) => Err(LocatorError::CapabilityLoad("no provider".to_string())),
        }
    }
}

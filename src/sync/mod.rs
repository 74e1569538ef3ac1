// src/sync/mod.rs
// DOCUMENTATION: Viewport synchronization core
// PURPOSE: Controller actor, settle debouncing and marker lifecycle

pub mod controller;
pub mod debounce;
pub mod markers;

pub use controller::{ControllerHandle, SyncSettings, ViewportController};

// src/capability/mod.rs
// DOCUMENTATION: External capability seams
// PURPOSE: Map engine, its loader, and the user position provider

pub mod geolocation;
pub mod headless;
pub mod loader;
pub mod map;

pub use geolocation::*;
pub use headless::{HeadlessMap, HeadlessProvider, HeadlessSdk, MarkerView};
pub use loader::CapabilityLoader;
pub use map::*;

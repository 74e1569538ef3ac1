// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod health;
pub mod session;
pub mod stations;

pub use health::config as health_config;
pub use session::config as session_config;
pub use stations::config as stations_config;

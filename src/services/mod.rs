// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod enrichment;
pub mod google_maps_client;
pub mod place_query;

pub use enrichment::*;
pub use google_maps_client::*;
pub use place_query::*;

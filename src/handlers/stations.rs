// src/handlers/stations.rs
// DOCUMENTATION: HTTP handlers for the enriched station list
// PURPOSE: Serve the last applied result set, paginated, straight from the controller snapshot

use actix_web::{web, HttpResponse, Responder};

use crate::errors::LocatorError;
use crate::models::{StationListQuery, StationListResponse};
use crate::sync::ControllerHandle;

/// GET /stations
/// Current enriched list, in provider order
pub async fn list_stations(
    controller: web::Data<ControllerHandle>,
    query: web::Query<StationListQuery>,
) -> Result<impl Responder, LocatorError> {
    let snapshot = controller.snapshot();
    let response =
        StationListResponse::paginate(&snapshot.places, query.page, query.per_page, snapshot.epoch);
    Ok(HttpResponse::Ok().json(response))
}

/// GET /stations/{id}
/// One place from the current list
pub async fn get_station(
    controller: web::Data<ControllerHandle>,
    path: web::Path<String>,
) -> Result<impl Responder, LocatorError> {
    let id = path.into_inner();
    let snapshot = controller.snapshot();

    let place = snapshot
        .places
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or(LocatorError::NotFound(id))?;

    Ok(HttpResponse::Ok().json(place))
}

/// Configuration for station routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stations")
            .route("", web::get().to(list_stations))
            .route("/{id}", web::get().to(get_station)),
    );
}

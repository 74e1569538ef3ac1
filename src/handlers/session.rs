// src/handlers/session.rs
// DOCUMENTATION: HTTP handlers for the map session
// PURPOSE: Feed geolocation, map gestures and selection into the controller; expose its state

use actix_web::{web, HttpResponse, Responder};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::capability::{
    GeoPositionProvider, GeolocationErrorCode, HeadlessMap, HeadlessProvider, MarkerKind,
    MarkerView,
};
use crate::errors::LocatorError;
use crate::models::{
    CoordinateRequest, Place, PositionErrorRequest, SelectionRequest, SettleRequest,
};
use crate::sync::ControllerHandle;

fn validated<T: Validate>(req: &T) -> Result<(), LocatorError> {
    req.validate()
        .map_err(|e| LocatorError::ValidationError(e.to_string()))
}

fn live_map(provider: &HeadlessProvider) -> Result<Arc<HeadlessMap>, LocatorError> {
    provider.map().ok_or(LocatorError::ServiceUnavailable)
}

/// GET /session
/// Controller snapshot plus geolocation state
pub async fn get_session(
    controller: web::Data<ControllerHandle>,
    geo: web::Data<Arc<GeoPositionProvider>>,
) -> Result<impl Responder, LocatorError> {
    let snapshot = controller.snapshot();
    let position = geo.snapshot();

    Ok(HttpResponse::Ok().json(json!({
        "session": snapshot,
        "geolocation": {
            "permission": position.permission,
            "coords": position.coords,
            "error": position.error.as_ref().map(|e| e.user_message()),
            "refreshRequests": position.refresh_requests,
        }
    })))
}

/// POST /session/center
/// Programmatic re-center, fetched without debounce
pub async fn set_center(
    controller: web::Data<ControllerHandle>,
    req: web::Json<CoordinateRequest>,
) -> Result<impl Responder, LocatorError> {
    validated(&req.0)?;
    controller.set_center(req.coordinate())?;
    Ok(HttpResponse::Accepted().json(json!({ "status": "accepted" })))
}

/// GET /session/map
/// Summary of the live map instance
pub async fn get_map(
    maps: web::Data<Arc<HeadlessProvider>>,
) -> Result<impl Responder, LocatorError> {
    let map = live_map(&maps)?;
    Ok(HttpResponse::Ok().json(map.stats()))
}

/// POST /session/map/settle
/// Simulate a user pan (and optional zoom) that ends at the given point
pub async fn settle_map(
    maps: web::Data<Arc<HeadlessProvider>>,
    req: web::Json<SettleRequest>,
) -> Result<impl Responder, LocatorError> {
    validated(&req.0)?;
    let map = live_map(&maps)?;
    map.drag_to(req.coordinate());
    if let Some(zoom) = req.zoom {
        map.zoom_to(zoom);
    }
    Ok(HttpResponse::Accepted().json(json!({ "status": "accepted", "zoom": map.zoom() })))
}

/// POST /session/position
/// Geolocation fix from the device
pub async fn report_position(
    geo: web::Data<Arc<GeoPositionProvider>>,
    req: web::Json<CoordinateRequest>,
) -> Result<impl Responder, LocatorError> {
    validated(&req.0)?;
    geo.report_fix(req.coordinate());
    Ok(HttpResponse::Accepted().json(json!({ "status": "accepted" })))
}

/// POST /session/position/error
pub async fn report_position_error(
    geo: web::Data<Arc<GeoPositionProvider>>,
    req: web::Json<PositionErrorRequest>,
) -> Result<impl Responder, LocatorError> {
    validated(&req.0)?;
    let req = req.into_inner();
    let code = GeolocationErrorCode::from_code(req.code);
    geo.report_error(code, req.message.unwrap_or_default());
    Ok(HttpResponse::Accepted().json(json!({ "status": "accepted", "code": code })))
}

/// POST /session/position/refresh
/// Ask the device side for a new fix
pub async fn refresh_position(
    geo: web::Data<Arc<GeoPositionProvider>>,
) -> Result<impl Responder, LocatorError> {
    geo.refresh();
    Ok(HttpResponse::Accepted().json(json!({
        "status": "accepted",
        "refreshRequests": geo.snapshot().refresh_requests
    })))
}

/// PUT /session/selection
/// Select a place from the list, or clear the selection
pub async fn set_selection(
    controller: web::Data<ControllerHandle>,
    req: web::Json<SelectionRequest>,
) -> Result<impl Responder, LocatorError> {
    validated(&req.0)?;
    let id = req.into_inner().id;

    if let Some(id) = &id {
        let known = controller.snapshot().places.iter().any(|p| &p.id == id);
        if !known {
            return Err(LocatorError::NotFound(id.clone()));
        }
    }

    controller.select(id.clone())?;
    Ok(HttpResponse::Ok().json(json!({ "selectedId": id })))
}

/// POST /session/markers/{id}/click
/// Simulate a click on a place marker
pub async fn click_marker(
    maps: web::Data<Arc<HeadlessProvider>>,
    path: web::Path<String>,
) -> Result<impl Responder, LocatorError> {
    let place_id = path.into_inner();
    let map = live_map(&maps)?;

    let marker = map
        .find_marker_by_tag(&place_id)
        .ok_or_else(|| LocatorError::NotFound(place_id.clone()))?;
    map.click_marker(marker);

    Ok(HttpResponse::Accepted().json(json!({ "status": "accepted", "placeId": place_id })))
}

/// GET /session/markers
/// Live markers as a GeoJSON FeatureCollection
pub async fn list_markers(
    controller: web::Data<ControllerHandle>,
    maps: web::Data<Arc<HeadlessProvider>>,
) -> Result<impl Responder, LocatorError> {
    let markers = maps.map().map(|m| m.markers()).unwrap_or_default();
    let snapshot = controller.snapshot();
    let collection = markers_to_geojson(&markers, &snapshot.places);

    Ok(HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(collection))
}

/// Build a FeatureCollection, one Point per marker
/// DOCUMENTATION: Place markers carry the distance text of their place
/// when the current result set has one.
pub fn markers_to_geojson(markers: &[MarkerView], places: &[Place]) -> FeatureCollection {
    let features = markers
        .iter()
        .map(|marker| {
            let point = geo_types::Point::from(marker.position);

            let mut properties = JsonObject::new();
            properties.insert("kind".to_string(), json!(marker.kind));
            properties.insert("title".to_string(), json!(marker.title));
            properties.insert("highlighted".to_string(), json!(marker.highlighted));

            if marker.kind == MarkerKind::Place {
                if let Some(tag) = &marker.tag {
                    properties.insert("placeId".to_string(), json!(tag));
                    let distance = places
                        .iter()
                        .find(|p| &p.id == tag)
                        .and_then(|p| p.distance_text.clone());
                    properties.insert("distanceText".to_string(), json!(distance));
                }
            }

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&point))),
                id: Some(Id::String(marker.id.to_string())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Configuration for session routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/session")
            .route("", web::get().to(get_session))
            .route("/center", web::post().to(set_center))
            .route("/map", web::get().to(get_map))
            .route("/map/settle", web::post().to(settle_map))
            .route("/position", web::post().to(report_position))
            .route("/position/error", web::post().to(report_position_error))
            .route("/position/refresh", web::post().to(refresh_position))
            .route("/selection", web::put().to(set_selection))
            .route("/markers", web::get().to(list_markers))
            .route("/markers/{id}/click", web::post().to(click_marker)),
    );
}

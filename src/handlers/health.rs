// src/handlers/health.rs
// DOCUMENTATION: Health check handler
// PURPOSE: Liveness plus the state of the map capability and the controller

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use std::sync::Arc;

use crate::capability::CapabilityLoader;
use crate::sync::ControllerHandle;

pub async fn health_check(
    loader: web::Data<Arc<CapabilityLoader>>,
    controller: web::Data<ControllerHandle>,
) -> impl Responder {
    let snapshot = controller.snapshot();
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "auphere-stations",
        "version": env!("CARGO_PKG_VERSION"),
        "mapCapability": loader.status(),
        "mapProviderLoaded": loader.handle().is_some(),
        "controllerPhase": snapshot.phase,
        "epoch": snapshot.epoch
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, wire the sync pipeline, and start the HTTP shell

mod capability;
mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod sync;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use dotenv::dotenv;
use std::io;
use std::sync::Arc;

use capability::{CapabilityLoader, GeoPositionProvider, HeadlessProvider, HeadlessSdk};
use models::Place;
use services::{DistanceEnricher, GoogleMapsClient, PlaceQueryService, RoadDistanceProvider};
use sync::{SyncSettings, ViewportController};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    for warning in &config.warnings {
        log::warn!("{}", warning);
    }
    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting auphere-stations microservice...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Provider clients
    let google = Arc::new(GoogleMapsClient::new(
        config.google_maps_api_key.clone(),
        config.google_maps_base_url.clone(),
        config.provider_rate_per_sec,
    ));
    let query = PlaceQueryService::new(google.clone());

    let road: Option<Arc<dyn RoadDistanceProvider>> = if config.use_distance_matrix() {
        log::info!("Distance Matrix enabled (timeout {:?})", config.provider_timeout());
        Some(google)
    } else {
        log::info!("Distance Matrix disabled, using great-circle distances");
        None
    };
    let enricher = match road {
        Some(road) => DistanceEnricher::new(Some(road), config.provider_timeout()),
        None => DistanceEnricher::great_circle(),
    };

    // 5. Map capability and position provider
    let maps = HeadlessProvider::new();
    let loader = CapabilityLoader::new();
    loader.load(Arc::new(HeadlessSdk::new(Arc::clone(&maps))));

    let geo = Arc::new(GeoPositionProvider::new());
    let refresh_geo = Arc::clone(&geo);
    tokio::spawn(async move {
        loop {
            refresh_geo.refresh_requested().await;
            match refresh_geo.coords() {
                Some(last) => log::info!("Position refresh requested, last fix {}", last),
                None => log::info!("Position refresh requested, no fix yet"),
            }
        }
    });

    // 6. Viewport controller
    let (controller, controller_task) = ViewportController::spawn(
        SyncSettings::from_config(&config),
        query,
        enricher,
        Arc::clone(&geo),
        Arc::clone(&loader),
        Arc::new(|place: &Place| log::info!("Station selected: {} ({})", place.name, place.id)),
    );

    // 7. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_clone = config.clone();
    let controller_data = controller.clone();

    let result = HttpServer::new(move || {
        App::new()
            // Application state (config, controller, capabilities)
            .app_data(web::Data::new(config_clone.clone()))
            .app_data(web::Data::new(controller_data.clone()))
            .app_data(web::Data::new(Arc::clone(&geo)))
            .app_data(web::Data::new(Arc::clone(&maps)))
            .app_data(web::Data::new(Arc::clone(&loader)))
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::stations_config)
            .configure(handlers::session_config)
    })
    .bind(&server_addr)?
    .run()
    .await;

    // 8. Release map resources
    controller.shutdown();
    if let Err(e) = controller_task.await {
        log::error!("Viewport controller task failed: {}", e);
    }

    result
}

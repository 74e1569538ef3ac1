// src/config/env.rs
// DOCUMENTATION: Environment variable management
// PURPOSE: Load and validate configuration from .env files

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::flags::{FeatureFlags, FlagValue, ENABLE_DISTANCE_MATRIX, PLACE_CATEGORY};
use crate::models::Coordinate;

/// Application configuration loaded from environment variables
/// DOCUMENTATION: Centralizes all configuration in one struct
/// Load with Config::from_env() at application startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "127.0.0.1")
    pub server_address: String,

    /// Server listen port (default 8003)
    pub server_port: u16,

    /// Environment: development, staging, production
    pub environment: String,

    /// Log level: debug, info, warn, error
    pub log_level: String,

    /// Google Maps Platform API key (Places + Distance Matrix)
    pub google_maps_api_key: String,

    /// Root of the Google Maps web service APIs
    pub google_maps_base_url: String,

    /// Provider category tag passed to nearby search
    pub place_category: String,

    /// Nearby search radius in meters
    pub search_radius_m: u32,

    /// Maximum places kept per cycle
    pub result_limit: usize,

    /// Quiet window for map-settle events
    pub settle_debounce_ms: u64,

    /// How long to wait for a first geolocation fix before using the default center
    pub geolocation_grace_ms: u64,

    /// Center used when no geolocation fix is available
    pub default_center: Coordinate,

    /// Duration of the selected-marker highlight
    pub highlight_ms: u64,

    /// Initial map zoom
    pub map_zoom: u8,

    /// Timeout for the road-distance call
    pub provider_timeout_secs: u64,

    /// Outgoing provider requests per second
    pub provider_rate_per_sec: u32,

    /// Read-only feature flags
    pub flags: FeatureFlags,

    /// Problems found while loading, logged once logging is up
    pub warnings: Vec<String>,
}

/// Environment reader that records bad values instead of logging them
#[derive(Default)]
struct EnvReader {
    warnings: Vec<String>,
}

impl EnvReader {
    fn parse_or<T: FromStr>(&mut self, key: &str, default: T) -> T {
        match env::var(key) {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                self.warnings
                    .push(format!("Invalid value for {}: {:?}, using default", key, raw));
                default
            }),
            Err(_) => default,
        }
    }

    fn check_flags(&mut self, flags: &FeatureFlags) {
        for entry in flags.ignored() {
            self.warnings
                .push(format!("Ignoring feature flag entry without a key: {}", entry));
        }
        if let Some(FlagValue::Text(raw)) = flags.get(ENABLE_DISTANCE_MATRIX) {
            self.warnings.push(format!(
                "Feature flag {} is not a boolean ({:?}), treating it as off",
                ENABLE_DISTANCE_MATRIX, raw
            ));
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    /// DOCUMENTATION: Reads from .env or process environment
    /// Called once at application startup
    pub fn from_env() -> Self {
        dotenv().ok();

        let mut flags = FeatureFlags::parse(&env::var("FEATURE_FLAGS").unwrap_or_default());
        if let Ok(raw) = env::var("ENABLE_DISTANCE_MATRIX") {
            let enabled = matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on");
            flags = flags.with(ENABLE_DISTANCE_MATRIX, FlagValue::Bool(enabled));
        }

        let mut reader = EnvReader::default();
        reader.check_flags(&flags);

        Config {
            server_address: env::var("SERVER_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),

            server_port: reader.parse_or("SERVER_PORT", 8003),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY").unwrap_or_default(),

            google_maps_base_url: env::var("GOOGLE_MAPS_BASE_URL")
                .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string()),

            place_category: flags
                .text(PLACE_CATEGORY)
                .map(str::to_string)
                .or_else(|| env::var("PLACE_CATEGORY").ok())
                .unwrap_or_else(|| "gas_station".to_string()),

            search_radius_m: reader.parse_or("SEARCH_RADIUS_M", 5000),

            result_limit: reader.parse_or("RESULT_LIMIT", 50),

            settle_debounce_ms: reader.parse_or("SETTLE_DEBOUNCE_MS", 500),

            geolocation_grace_ms: reader.parse_or("GEOLOCATION_GRACE_MS", 5000),

            // Geographic center of the contiguous United States
            default_center: Coordinate::new(
                reader.parse_or("DEFAULT_CENTER_LAT", 39.8283),
                reader.parse_or("DEFAULT_CENTER_LNG", -98.5795),
            ),

            highlight_ms: reader.parse_or("HIGHLIGHT_MS", 1400),

            map_zoom: reader.parse_or("MAP_ZOOM", 13),

            provider_timeout_secs: reader.parse_or("PROVIDER_TIMEOUT_SECS", 10),

            provider_rate_per_sec: reader.parse_or("PROVIDER_RATE_PER_SEC", 10),

            flags,

            warnings: reader.warnings,
        }
    }

    /// Validate critical configuration
    /// DOCUMENTATION: Ensures application can start safely
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_center.is_valid() {
            return Err(format!(
                "DEFAULT_CENTER_LAT/LNG out of range: {}",
                self.default_center
            ));
        }

        if self.search_radius_m == 0 || self.search_radius_m > 50_000 {
            return Err("SEARCH_RADIUS_M must be between 1 and 50000".to_string());
        }

        if self.result_limit == 0 {
            return Err("RESULT_LIMIT must be at least 1".to_string());
        }

        if self.google_maps_api_key.is_empty() {
            log::warn!("GOOGLE_MAPS_API_KEY not configured - nearby search will fail");
        }

        Ok(())
    }

    pub fn use_distance_matrix(&self) -> bool {
        self.flags.is_enabled(ENABLE_DISTANCE_MATRIX)
    }

    pub fn settle_debounce(&self) -> Duration {
        Duration::from_millis(self.settle_debounce_ms)
    }

    pub fn geolocation_grace(&self) -> Duration {
        Duration::from_millis(self.geolocation_grace_ms)
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

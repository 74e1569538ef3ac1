// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for the station locator pipeline and its HTTP shell

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::capability::GeolocationErrorCode;

/// Application-specific error types
/// DOCUMENTATION: One enum for every failure the pipeline can produce.
/// Provider variants keep the raw detail for logs only; HTTP clients see
/// `user_message()` instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocatorError {
    #[error("Map capability failed to load: {0}")]
    CapabilityLoad(String),

    #[error("Geolocation error ({code:?}): {message}")]
    Geolocation {
        code: GeolocationErrorCode,
        message: String,
    },

    #[error("Place query failed: {0}")]
    ProviderQuery(String),

    #[error("Distance enrichment failed: {0}")]
    Enrichment(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Place not found with id: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
}

impl LocatorError {
    /// Short, non-technical message safe to show to end users
    pub fn user_message(&self) -> &'static str {
        match self {
            LocatorError::CapabilityLoad(_) => "The map could not be loaded.",
            LocatorError::Geolocation { code, .. } => match code {
                GeolocationErrorCode::PermissionDenied => "Location access was denied.",
                GeolocationErrorCode::Timeout => "Finding your location took too long.",
                _ => "Your location is unavailable.",
            },
            LocatorError::ProviderQuery(_) => "Could not load nearby stations. Try again.",
            LocatorError::Enrichment(_) => "Distances are approximate right now.",
            LocatorError::RateLimitExceeded => "Too many searches. Please wait a moment.",
            LocatorError::NotFound(_) => "That station is no longer in the list.",
            LocatorError::InvalidInput(_) | LocatorError::ValidationError(_) => {
                "The request was not valid."
            }
            LocatorError::ServiceUnavailable => "The map session is not running.",
        }
    }

    /// Whether this failure ends a fetch cycle without new results.
    /// Enrichment failures never do: they fall back to great-circle distances.
    pub fn is_cycle_failure(&self) -> bool {
        matches!(
            self,
            LocatorError::ProviderQuery(_) | LocatorError::RateLimitExceeded
        )
    }
}

/// Convert LocatorError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for LocatorError {
    fn error_response(&self) -> HttpResponse {
        let error_code = match self {
            LocatorError::CapabilityLoad(_) => "CAPABILITY_LOAD_ERROR",
            LocatorError::Geolocation { .. } => "GEOLOCATION_ERROR",
            LocatorError::ProviderQuery(_) => "PROVIDER_QUERY_ERROR",
            LocatorError::Enrichment(_) => "ENRICHMENT_ERROR",
            LocatorError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            LocatorError::NotFound(_) => "NOT_FOUND",
            LocatorError::InvalidInput(_) => "INVALID_INPUT",
            LocatorError::ValidationError(_) => "VALIDATION_ERROR",
            LocatorError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        };

        // Validation detail is about the caller's own request, so it is safe to echo
        let message = match self {
            LocatorError::InvalidInput(_) | LocatorError::ValidationError(_) => self.to_string(),
            _ => self.user_message().to_string(),
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            LocatorError::CapabilityLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            LocatorError::Geolocation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LocatorError::ProviderQuery(_) => StatusCode::BAD_GATEWAY,
            LocatorError::Enrichment(_) => StatusCode::BAD_GATEWAY,
            LocatorError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            LocatorError::NotFound(_) => StatusCode::NOT_FOUND,
            LocatorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LocatorError::ValidationError(_) => StatusCode::BAD_REQUEST,
            LocatorError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_detail_not_exposed() {
        let err = LocatorError::ProviderQuery("REQUEST_DENIED: key expired".to_string());
        assert!(!err.user_message().contains("REQUEST_DENIED"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_cycle_failure_classification() {
        assert!(LocatorError::ProviderQuery("x".to_string()).is_cycle_failure());
        assert!(LocatorError::RateLimitExceeded.is_cycle_failure());
        assert!(!LocatorError::Enrichment("x".to_string()).is_cycle_failure());
    }
}

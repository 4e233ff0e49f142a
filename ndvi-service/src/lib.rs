//! NDVI Service Library
//!
//! HTTP handlers and types for the point NDVI service.
//! This library is used by both the ndvi-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use ndvi::{NdviAnalyzer, NdviError, ServiceAccountKey};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Service-account credential as loaded at startup.
///
/// A missing or malformed key does not stop the service from starting; every
/// NDVI request reports it instead.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Key parsed successfully.
    Ready(ServiceAccountKey),
    /// Key unavailable, with the reason.
    Unavailable(String),
}

impl Credential {
    /// Load the key from `GEE_PRIVATE_KEY`.
    pub fn from_env() -> Self {
        ServiceAccountKey::from_env().into()
    }

    /// The key, or [`NdviError::Configuration`] if it could not be loaded.
    pub fn key(&self) -> ndvi::Result<&ServiceAccountKey> {
        match self {
            Credential::Ready(key) => Ok(key),
            Credential::Unavailable(reason) => Err(NdviError::Configuration(reason.clone())),
        }
    }
}

impl From<ndvi::Result<ServiceAccountKey>> for Credential {
    fn from(result: ndvi::Result<ServiceAccountKey>) -> Self {
        match result {
            Ok(key) => Credential::Ready(key),
            Err(NdviError::Configuration(reason)) => Credential::Unavailable(reason),
            Err(e) => Credential::Unavailable(e.to_string()),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    /// NDVI pipeline over the Earth Engine backend.
    pub analyzer: NdviAnalyzer,
    /// Credential every request authenticates with.
    pub credential: Credential,
}

/// OpenAPI documentation for the NDVI service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "NDVI Service",
        version = "0.1.0",
        description = "Point NDVI from the most recent cloud-free Sentinel-2 scene, computed by Google Earth Engine.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(handlers::get_ndvi, handlers::health_check),
    components(schemas(
        handlers::NdviResponse,
        handlers::ErrorResponse,
        handlers::HealthResponse,
    )),
    tags(
        (name = "ndvi", description = "NDVI query endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router.
///
/// `/ndvi` is also mounted at `/` and `/api/get-ndvi`. Every response carries
/// `Access-Control-Allow-Origin: *`, and `OPTIONS` requests are answered by
/// the CORS layer with an empty `200`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/ndvi", get(handlers::get_ndvi))
        .route("/", get(handlers::get_ndvi))
        .route("/api/get-ndvi", get(handlers::get_ndvi))
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{ErrorResponse, HealthResponse, NdviQuery, NdviResponse};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_from_missing_key() {
        let credential = Credential::from(Err(NdviError::Configuration(
            "GEE_PRIVATE_KEY not set.".to_string(),
        )));
        let err = credential.key().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server config error: GEE_PRIVATE_KEY not set."
        );
    }

    #[test]
    fn test_credential_ready() {
        let key = ServiceAccountKey::from_json(r#"{"client_email": "a@b.c", "private_key": "pem"}"#)
            .unwrap();
        let credential = Credential::from(Ok(key));
        assert_eq!(credential.key().unwrap().client_email, "a@b.c");
    }

    #[test]
    fn test_openapi_lists_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/ndvi"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}

//! HTTP request handlers for the NDVI service.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndvi::{AnalysisResult, Coordinate, NdviError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Query parameters for the NDVI endpoint.
///
/// Both values are taken as raw strings so that missing and malformed input
/// produce the same client error.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NdviQuery {
    /// Latitude in decimal degrees (-90 to 90).
    #[param(example = "41.39")]
    pub lat: Option<String>,
    /// Longitude in decimal degrees (-180 to 180).
    #[param(example = "2.17")]
    pub lon: Option<String>,
}

/// Successful NDVI response.
#[derive(Debug, Serialize, ToSchema)]
pub struct NdviResponse {
    /// Acquisition date of the scene (YYYY-MM-dd).
    #[schema(example = "2024-05-28")]
    pub date: String,
    /// Mean NDVI at the point (-1 to 1).
    #[schema(example = 0.42)]
    pub ndvi: f64,
}

impl From<AnalysisResult> for NdviResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            date: result.date,
            ndvi: result.ndvi,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Get NDVI for given coordinates.
///
/// Looks up the most recent Sentinel-2 scene with less than 10% cloud cover
/// acquired over the point in the last 120 days and returns its NDVI.
///
/// # Returns
///
/// - `200 OK` with `{date, ndvi}` on success
/// - `400 Bad Request` if coordinates are missing or invalid
/// - `500 Internal Server Error` on configuration, authentication or Earth
///   Engine failures, including no matching scene and no data at the point
#[utoipa::path(
    get,
    path = "/ndvi",
    params(NdviQuery),
    responses(
        (status = 200, description = "NDVI at the point", body = NdviResponse),
        (status = 400, description = "Missing or invalid coordinates", body = ErrorResponse),
        (status = 500, description = "Lookup failed", body = ErrorResponse)
    ),
    tag = "ndvi"
)]
#[axum::debug_handler]
pub async fn get_ndvi(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NdviQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(query)| query).unwrap_or_default();

    let key = match state.credential.key() {
        Ok(key) => key,
        Err(e) => return error_response(query.lat.as_deref(), query.lon.as_deref(), e),
    };

    let point = match Coordinate::parse(query.lat.as_deref(), query.lon.as_deref()) {
        Ok(point) => point,
        Err(e) => return error_response(query.lat.as_deref(), query.lon.as_deref(), e),
    };

    tracing::debug!(lat = point.lat, lon = point.lon, "NDVI query");

    match state.analyzer.analyze(key, point).await {
        Ok(result) => {
            tracing::info!(
                lat = point.lat,
                lon = point.lon,
                date = %result.date,
                ndvi = result.ndvi,
                "NDVI found"
            );
            (StatusCode::OK, Json(NdviResponse::from(result))).into_response()
        }
        Err(e) => error_response(query.lat.as_deref(), query.lon.as_deref(), e),
    }
}

/// Create an error response for NDVI queries.
fn error_response(lat: Option<&str>, lon: Option<&str>, e: NdviError) -> Response {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    tracing::warn!(lat = ?lat, lon = ?lon, error = %e, "NDVI query failed");

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

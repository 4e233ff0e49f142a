//! NDVI Service - HTTP microservice for point NDVI lookups.
//!
//! Returns the NDVI of the most recent cloud-free Sentinel-2 scene at a
//! coordinate, computed by Google Earth Engine.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GEE_PRIVATE_KEY` | Service-account key JSON | Required (requests fail with 500 without it) |
//! | `NDVI_PORT` | HTTP server port | 8080 |
//! | `GEE_API_URL` | Earth Engine REST API base URL | `https://earthengine.googleapis.com` |
//! | `GEE_TOKEN_URL` | OAuth token endpoint override | Key's `token_uri` |
//! | `GEE_PROJECT` | Cloud project override | Key's `project_id` |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /ndvi?lat=X&lon=Y` - NDVI at coordinates (also at `/` and `/api/get-ndvi`)
//! - `OPTIONS *` - CORS pre-flight
//! - `GET /health` - Health check
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use ndvi::{ClientConfig, EarthEngineClient, NdviAnalyzer};
use ndvi_service::{app, AppState, Credential};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ndvi_service=info,ndvi=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("NDVI_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let credential = Credential::from_env();
    if let Credential::Unavailable(reason) = &credential {
        tracing::warn!(reason = %reason, "Service-account key unavailable, NDVI requests will fail");
    }

    let config = ClientConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        project = ?config.project,
        port = port,
        "Starting NDVI service"
    );

    let analyzer = NdviAnalyzer::new(EarthEngineClient::new(config)?);
    let state = Arc::new(AppState {
        analyzer,
        credential,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

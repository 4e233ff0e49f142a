//! # NDVI - point vegetation index lookups
//!
//! Looks up the Normalized Difference Vegetation Index at a single coordinate
//! from the most recent cloud-free Sentinel-2 scene, computed by Google Earth
//! Engine.
//!
//! ## Features
//!
//! - **Typed expressions**: Earth Engine queries are built with a small
//!   chainable builder ([`expr`]) and can be inspected without network access
//! - **Explicit credentials**: the service-account key is passed in, never read
//!   from ambient state by the pipeline
//! - **Pluggable backend**: the pipeline talks to an [`EarthEngine`] trait,
//!   implemented over the REST API by [`EarthEngineClient`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use ndvi::{ClientConfig, Coordinate, EarthEngineClient, NdviAnalyzer, ServiceAccountKey};
//!
//! let key = ServiceAccountKey::from_env()?;
//! let analyzer = NdviAnalyzer::new(EarthEngineClient::new(ClientConfig::default())?);
//!
//! let point = Coordinate::parse(Some("41.39"), Some("2.17"))?;
//! let result = analyzer.analyze(&key, point).await?;
//! println!("NDVI {} on {}", result.ndvi, result.date);
//! ```
//!
//! ## Query
//!
//! - Collection: `COPERNICUS/S2_SR_HARMONIZED`
//! - Window: trailing 120 days
//! - Cloud filter: `CLOUDY_PIXEL_PERCENTAGE < 10`
//! - Selection: most recent `system:time_start`
//! - NDVI: `(B8 - B4) / (B8 + B4)`, mean over the point at 10 m scale

pub mod analysis;
pub mod auth;
pub mod client;
pub mod coords;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod expr;

// Re-export main types at crate root for convenience
pub use analysis::{AnalysisResult, NdviAnalyzer};
pub use client::{ClientConfig, EarthEngineClient};
pub use coords::Coordinate;
pub use credentials::ServiceAccountKey;
pub use engine::{open_session, AccessToken, EarthEngine, Session};
pub use error::{NdviError, Result};

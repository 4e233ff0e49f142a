//! Point NDVI analysis.
//!
//! This module provides [`NdviAnalyzer`], which runs the whole lookup for a
//! validated coordinate:
//!
//! 1. open an Earth Engine session (authenticate, then initialize)
//! 2. find the most recent Sentinel-2 scene over the point acquired in the
//!    last 120 days with less than 10% cloudy pixels
//! 3. evaluate NDVI (`B8` vs `B4`) at the point together with the scene date
//!
//! Each step only starts once the previous one resolved, and the first
//! failure ends the lookup. Nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coords::Coordinate;
use crate::credentials::ServiceAccountKey;
use crate::engine::{open_session, EarthEngine};
use crate::error::{NdviError, Result};
use crate::expr::{
    Dictionary, EeDate, Expression, Filter, Geometry, Image, ImageCollection, Reducer, ValueNode,
};

/// Harmonized Sentinel-2 surface reflectance collection.
pub const COLLECTION_ID: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Length of the trailing acquisition window.
pub const LOOKBACK_DAYS: i64 = 120;

/// Metadata property holding the scene cloud cover percentage.
pub const CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Scenes must be strictly below this cloud cover percentage.
pub const MAX_CLOUD_PERCENTAGE: f64 = 10.0;

/// Near-infrared band.
pub const NIR_BAND: &str = "B8";

/// Red band.
pub const RED_BAND: &str = "B4";

/// Name given to the computed band.
pub const NDVI_BAND: &str = "NDVI";

/// Sampling scale of the region reduction, in meters.
pub const SCALE_METERS: f64 = 10.0;

/// Pattern of the reported acquisition date.
pub const DATE_FORMAT: &str = "YYYY-MM-dd";

const TIME_START: &str = "system:time_start";
const INDEX: &str = "system:index";

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Acquisition date of the scene (`YYYY-MM-dd`).
    pub date: String,
    /// Mean NDVI at the point, in [-1, 1].
    pub ndvi: f64,
}

impl AnalysisResult {
    /// Interpret the evaluated `{date, ndvi}` dictionary.
    ///
    /// A null or missing `ndvi` means the pixel is masked at the point
    /// ([`NdviError::NoData`]). Any other shape is an evaluation error.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(NdviError::Evaluation(format!(
                    "unexpected result: {}",
                    other
                )))
            }
        };

        let date = match map.get("date") {
            Some(Value::String(date)) => date.clone(),
            other => {
                return Err(NdviError::Evaluation(format!(
                    "missing acquisition date (got {})",
                    other.cloned().unwrap_or(Value::Null)
                )))
            }
        };

        match map.get("ndvi") {
            None | Some(Value::Null) => Err(NdviError::NoData),
            Some(value) => value
                .as_f64()
                .map(|ndvi| Self { date, ndvi })
                .ok_or_else(|| NdviError::Evaluation(format!("non-numeric NDVI: {}", value))),
        }
    }
}

/// The most recent cloud-free scene over `point` as of `now`.
pub fn latest_clear_image(point: &Coordinate, now: DateTime<Utc>) -> Image {
    let aoi = Geometry::point(point.lon, point.lat);
    let start = now - Duration::days(LOOKBACK_DAYS);

    ImageCollection::load(COLLECTION_ID)
        .filter_bounds(&aoi)
        .filter_date(
            EeDate::from_millis(start.timestamp_millis()),
            EeDate::from_millis(now.timestamp_millis()),
        )
        .filter(Filter::lt(CLOUD_PROPERTY, MAX_CLOUD_PERCENTAGE))
        .sort(TIME_START, false)
        .first()
}

/// Expression resolving to the catalog index of `image`, null when there is
/// no such image.
pub fn image_index(image: &Image) -> Expression {
    Expression::new(image.get(INDEX))
}

/// Dictionary `{date, ndvi}` for `image` sampled at `point`.
pub fn ndvi_summary(image: &Image, point: &Coordinate) -> Dictionary {
    let aoi = Geometry::point(point.lon, point.lat);

    let ndvi = image
        .normalized_difference([NIR_BAND, RED_BAND])
        .rename(&[NDVI_BAND])
        .reduce_region(Reducer::mean(), &aoi, SCALE_METERS)
        .get(NDVI_BAND);

    let date = EeDate::from_value(image.get(TIME_START)).format(DATE_FORMAT);

    Dictionary::from_entries([
        ("date", ValueNode::from(date)),
        ("ndvi", ValueNode::from(ndvi)),
    ])
}

/// NDVI lookups against an [`EarthEngine`] backend.
///
/// # Example
///
/// ```ignore
/// use ndvi::{ClientConfig, Coordinate, EarthEngineClient, NdviAnalyzer, ServiceAccountKey};
///
/// let key = ServiceAccountKey::from_env()?;
/// let analyzer = NdviAnalyzer::new(EarthEngineClient::new(ClientConfig::from_env())?);
///
/// let result = analyzer.analyze(&key, Coordinate::new(41.39, 2.17)?).await?;
/// println!("{}: {:.3}", result.date, result.ndvi);
/// ```
#[derive(Clone)]
pub struct NdviAnalyzer {
    engine: Arc<dyn EarthEngine>,
}

impl NdviAnalyzer {
    /// Create an analyzer over the given backend.
    pub fn new(engine: impl EarthEngine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Create an analyzer over a shared backend.
    pub fn from_shared(engine: Arc<dyn EarthEngine>) -> Self {
        Self { engine }
    }

    /// Look up NDVI at `point` using the current time as window end.
    pub async fn analyze(&self, key: &ServiceAccountKey, point: Coordinate) -> Result<AnalysisResult> {
        self.analyze_at(key, point, Utc::now()).await
    }

    /// Look up NDVI at `point` with the acquisition window ending at `now`.
    ///
    /// # Errors
    ///
    /// - [`NdviError::Authentication`] if the session handshake fails
    /// - [`NdviError::NoImageFound`] if no scene passes the filters or the
    ///   lookup fails
    /// - [`NdviError::Evaluation`] if the NDVI evaluation fails
    /// - [`NdviError::NoData`] if NDVI is masked at the point
    pub async fn analyze_at(
        &self,
        key: &ServiceAccountKey,
        point: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let session = open_session(self.engine.as_ref(), key).await?;

        let image = latest_clear_image(&point, now);

        match self.engine.compute_value(&session, &image_index(&image)).await {
            Ok(Value::String(index)) if !index.is_empty() => {
                tracing::debug!(lat = point.lat, lon = point.lon, index = %index, "Scene selected");
            }
            Ok(other) => {
                tracing::debug!(lat = point.lat, lon = point.lon, result = %other, "No scene matched");
                return Err(NdviError::NoImageFound);
            }
            Err(e) => {
                tracing::debug!(lat = point.lat, lon = point.lon, error = %e, "Scene lookup failed");
                return Err(NdviError::NoImageFound);
            }
        }

        let summary = Expression::new(ndvi_summary(&image, &point));
        let value = self
            .engine
            .compute_value(&session, &summary)
            .await
            .map_err(|e| NdviError::Evaluation(e.upstream_message()))?;

        AnalysisResult::from_value(value)
    }
}

//! Coordinate parsing and validation.
//!
//! Request parameters arrive as strings. They are parsed here, before any
//! network activity, into a [`Coordinate`] whose range is already checked.

use std::ops::RangeInclusive;

use crate::error::{NdviError, Result};

/// Valid latitude range in decimal degrees.
pub const LAT_RANGE: RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in decimal degrees.
pub const LON_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude (-90 to 90).
    pub lat: f64,
    /// Longitude (-180 to 180).
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndvi::Coordinate;
    ///
    /// assert!(Coordinate::new(41.39, 2.17).is_ok());
    /// assert!(Coordinate::new(91.0, 0.0).is_err());
    /// assert!(Coordinate::new(0.0, f64::NAN).is_err());
    /// ```
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !LAT_RANGE.contains(&lat) || !LON_RANGE.contains(&lon) {
            return Err(NdviError::InvalidInput);
        }
        Ok(Self { lat, lon })
    }

    /// Parse a coordinate from optional request strings.
    ///
    /// Missing values, values that are not decimal numbers and values out of
    /// range all yield [`NdviError::InvalidInput`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ndvi::Coordinate;
    ///
    /// let point = Coordinate::parse(Some("41.39"), Some(" 2.17 ")).unwrap();
    /// assert_eq!(point.lon, 2.17);
    ///
    /// assert!(Coordinate::parse(Some("abc"), Some("2.17")).is_err());
    /// assert!(Coordinate::parse(None, Some("2.17")).is_err());
    /// ```
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Result<Self> {
        let lat = parse_degrees(lat)?;
        let lon = parse_degrees(lon)?;
        Self::new(lat, lon)
    }

    /// The point as a GeoJSON-ordered `[lon, lat]` pair.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

fn parse_degrees(value: Option<&str>) -> Result<f64> {
    value
        .map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or(NdviError::InvalidInput)
}

//! Error types for the NDVI library.

use thiserror::Error;

/// Errors that can occur while answering an NDVI lookup.
///
/// The first six variants are the outcomes a caller of
/// [`NdviAnalyzer`](crate::NdviAnalyzer) sees. The remaining ones are
/// transport-level failures raised by an [`EarthEngine`](crate::EarthEngine)
/// backend; the pipeline folds them into the step that failed.
#[derive(Error, Debug)]
pub enum NdviError {
    /// Latitude or longitude missing, unparseable or out of range.
    #[error("Invalid coordinates.")]
    InvalidInput,

    /// The service-account credential is missing or malformed.
    #[error("Server config error: {0}")]
    Configuration(String),

    /// The token exchange or the session initialization failed.
    #[error("GEE Authentication failed: {0}")]
    Authentication(String),

    /// No image passed the location, date and cloud filters.
    #[error("No recent cloud-free image found.")]
    NoImageFound,

    /// The service rejected or failed the NDVI evaluation.
    #[error("GEE Evaluation Error: {0}")]
    Evaluation(String),

    /// The image was found but NDVI is masked at the point.
    #[error("Point is likely in water or has no data.")]
    NoData,

    /// Non-success answer from a Google API.
    #[error("Earth Engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Signing the JWT assertion failed, usually because of a bad private key.
    #[error("Token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl NdviError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, NdviError::InvalidInput)
    }

    /// The message reported by the upstream service, without our own prefix.
    pub(crate) fn upstream_message(&self) -> String {
        match self {
            NdviError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias using [`NdviError`].
pub type Result<T> = std::result::Result<T, NdviError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(NdviError::InvalidInput.to_string(), "Invalid coordinates.");
        assert_eq!(
            NdviError::NoImageFound.to_string(),
            "No recent cloud-free image found."
        );
        assert_eq!(
            NdviError::NoData.to_string(),
            "Point is likely in water or has no data."
        );

        let err = NdviError::Configuration("GEE_PRIVATE_KEY not set.".to_string());
        assert_eq!(
            err.to_string(),
            "Server config error: GEE_PRIVATE_KEY not set."
        );

        let err = NdviError::Authentication("invalid_grant".to_string());
        assert!(err.to_string().starts_with("GEE Authentication failed"));
    }

    #[test]
    fn test_only_invalid_input_is_client_error() {
        assert!(NdviError::InvalidInput.is_client_error());
        assert!(!NdviError::NoData.is_client_error());
        assert!(!NdviError::Configuration(String::new()).is_client_error());
    }

    #[test]
    fn test_upstream_message_strips_prefix() {
        let err = NdviError::Api {
            status: 400,
            message: "Collection.first: Empty collection.".to_string(),
        };
        assert_eq!(err.upstream_message(), "Collection.first: Empty collection.");
        assert_eq!(NdviError::NoData.upstream_message(), NdviError::NoData.to_string());
    }
}

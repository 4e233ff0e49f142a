//! JWT bearer assertions for service-account authentication.
//!
//! A service account proves its identity by signing a short-lived JWT with
//! its RSA key and exchanging it at the OAuth token endpoint
//! (`urn:ietf:params:oauth:grant-type:jwt-bearer`).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::credentials::ServiceAccountKey;
use crate::error::Result;

/// OAuth scopes requested for Earth Engine access.
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/earthengine https://www.googleapis.com/auth/cloud-platform";

/// Grant type for the JWT bearer flow.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of an assertion. Google rejects anything over one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of the JWT assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account e-mail.
    pub iss: String,
    /// Space-separated scopes.
    pub scope: String,
    /// Token endpoint the assertion is addressed to.
    pub aud: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

impl AssertionClaims {
    /// Claims for `key`, addressed to `audience`, issued at `now`.
    pub fn new(key: &ServiceAccountKey, audience: &str, now: DateTime<Utc>) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }
}

/// Sign an RS256 assertion for `key`.
///
/// # Errors
///
/// Returns [`NdviError::Token`](crate::NdviError::Token) if the private key is
/// not a valid PEM-encoded RSA key.
pub fn sign_assertion(key: &ServiceAccountKey, audience: &str, now: DateTime<Utc>) -> Result<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = AssertionClaims::new(key, audience, now);
    Ok(encode(&header, &claims, &encoding_key)?)
}

//! The Earth Engine seam.
//!
//! [`EarthEngine`] is the contract the NDVI pipeline needs from the remote
//! service: a two-step session handshake and expression evaluation.
//! [`EarthEngineClient`](crate::client::EarthEngineClient) implements it over
//! the REST API; tests substitute scripted implementations.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::credentials::ServiceAccountKey;
use crate::error::{NdviError, Result};
use crate::expr::Expression;

/// Project used when neither the key nor the configuration names one.
pub const DEFAULT_PROJECT: &str = "earthengine-legacy";

/// An OAuth bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The bearer token itself.
    pub token: String,
    /// Lifetime in seconds as reported by the token endpoint.
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// An initialized Earth Engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for all calls of the session.
    pub access_token: AccessToken,
    /// Cloud project the calls are billed to.
    pub project: String,
}

impl Session {
    /// Resource path of the project, e.g. `projects/my-project`.
    pub fn project_path(&self) -> String {
        format!("projects/{}", self.project)
    }
}

/// Access to the Earth Engine service.
#[async_trait]
pub trait EarthEngine: Send + Sync {
    /// Exchange a service-account key for an access token.
    async fn authenticate(&self, key: &ServiceAccountKey) -> Result<AccessToken>;

    /// Confirm the token against the service and bind it to a project.
    async fn initialize(&self, token: AccessToken, project: &str) -> Result<Session>;

    /// Evaluate an expression and return its JSON value.
    async fn compute_value(&self, session: &Session, expression: &Expression) -> Result<Value>;
}

/// Run the authenticate-then-initialize handshake.
///
/// Initialization is only attempted after authentication succeeded. A
/// failure in either step is reported as [`NdviError::Authentication`].
pub async fn open_session(engine: &dyn EarthEngine, key: &ServiceAccountKey) -> Result<Session> {
    let token = engine
        .authenticate(key)
        .await
        .map_err(|e| NdviError::Authentication(e.upstream_message()))?;

    let project = key.project_id.as_deref().unwrap_or(DEFAULT_PROJECT);

    let session = engine
        .initialize(token, project)
        .await
        .map_err(|e| NdviError::Authentication(e.upstream_message()))?;

    tracing::debug!(project = %session.project, "Earth Engine session ready");
    Ok(session)
}

//! Earth Engine REST client.
//!
//! Implements [`EarthEngine`] over HTTPS with `reqwest`:
//!
//! - `authenticate`: `POST <token endpoint>` with a signed JWT assertion
//! - `initialize`: `GET <api>/v1/projects/<project>/algorithms`
//! - `compute_value`: `POST <api>/v1/projects/<project>/value:compute`
//!
//! No request timeout is configured; calls resolve or fail as the remote
//! side decides.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{sign_assertion, JWT_BEARER_GRANT};
use crate::credentials::ServiceAccountKey;
use crate::engine::{AccessToken, EarthEngine, Session};
use crate::error::{NdviError, Result};
use crate::expr::Expression;

/// Default Earth Engine REST endpoint.
pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com";

/// Connection settings for [`EarthEngineClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Earth Engine REST API, without trailing `/v1`.
    pub api_url: String,
    /// Token endpoint override. When `None`, the key's `token_uri` is used.
    pub token_url: Option<String>,
    /// Project override. When `None`, the key's `project_id` is used.
    pub project: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_url: None,
            project: None,
        }
    }
}

impl ClientConfig {
    /// Read overrides from `GEE_API_URL`, `GEE_TOKEN_URL` and `GEE_PROJECT`.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            api_url: non_empty("GEE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token_url: non_empty("GEE_TOKEN_URL"),
            project: non_empty("GEE_PROJECT"),
        }
    }

    /// Use a different API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Use a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    /// Bill calls to a specific project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Serialize)]
struct ComputeRequest<'a> {
    expression: &'a Expression,
}

#[derive(Debug, Deserialize)]
struct ComputeResponse {
    #[serde(default)]
    result: Value,
}

/// Error payloads returned by Google endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    /// Google API style: `{"error": {"code": 400, "message": "...", "status": "..."}}`
    Api { error: ApiErrorDetail },
    /// OAuth style: `{"error": "invalid_grant", "error_description": "..."}`
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ErrorBody {
    fn into_message(self) -> String {
        match self {
            ErrorBody::Api { error } => error.message,
            ErrorBody::OAuth {
                error,
                error_description: Some(description),
            } => format!("{}: {}", error, description),
            ErrorBody::OAuth { error, .. } => error,
        }
    }
}

/// Turn a non-success response into [`NdviError::Api`].
async fn api_error(response: Response) -> NdviError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.into_message(),
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => body,
    };

    NdviError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Earth Engine client over the REST API.
///
/// The underlying `reqwest::Client` pools connections, so one instance should
/// be shared by all requests of a process. Sessions are not shared.
#[derive(Debug, Clone)]
pub struct EarthEngineClient {
    http: Client,
    config: ClientConfig,
}

impl EarthEngineClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("ndvi/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl EarthEngine for EarthEngineClient {
    async fn authenticate(&self, key: &ServiceAccountKey) -> Result<AccessToken> {
        let token_url = self.config.token_url.as_deref().unwrap_or(key.token_uri());
        let assertion = sign_assertion(key, token_url, Utc::now())?;

        tracing::debug!(token_url, client_email = %key.client_email, "Requesting access token");

        let response = self
            .http
            .post(token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token: token.access_token,
            expires_in: token.expires_in,
        })
    }

    async fn initialize(&self, token: AccessToken, project: &str) -> Result<Session> {
        let session = Session {
            access_token: token,
            project: self.config.project.clone().unwrap_or_else(|| project.to_string()),
        };

        let url = format!(
            "{}/v1/{}/algorithms",
            self.config.api_base(),
            session.project_path()
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.access_token.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(session)
    }

    async fn compute_value(&self, session: &Session, expression: &Expression) -> Result<Value> {
        let url = format!(
            "{}/v1/{}/value:compute",
            self.config.api_base(),
            session.project_path()
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.access_token.token)
            .json(&ComputeRequest { expression })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: ComputeResponse = response.json().await?;
        Ok(body.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.token_url.is_none());
        assert!(config.project.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::default()
            .with_api_url("http://127.0.0.1:9000/")
            .with_token_url("http://127.0.0.1:9000/token")
            .with_project("ndvi-demo");
        assert_eq!(config.api_base(), "http://127.0.0.1:9000");
        assert_eq!(config.token_url.as_deref(), Some("http://127.0.0.1:9000/token"));
        assert_eq!(config.project.as_deref(), Some("ndvi-demo"));
    }

    #[test]
    fn test_error_body_api_style() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error": {"code": 400, "message": "Image.reduceRegion: bad scale", "status": "INVALID_ARGUMENT"}}"#,
        )
        .unwrap();
        assert_eq!(body.into_message(), "Image.reduceRegion: bad scale");
    }

    #[test]
    fn test_error_body_oauth_style() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#,
        )
        .unwrap();
        assert_eq!(body.into_message(), "invalid_grant: Invalid JWT Signature.");

        let body: ErrorBody = serde_json::from_str(r#"{"error": "unauthorized_client"}"#).unwrap();
        assert_eq!(body.into_message(), "unauthorized_client");
    }

    #[test]
    fn test_compute_response_missing_result_is_null() {
        let body: ComputeResponse = serde_json::from_str("{}").unwrap();
        assert!(body.result.is_null());
    }
}

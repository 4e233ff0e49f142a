//! Integration tests for the REST client against a local stand-in for the
//! Google token endpoint and the Earth Engine API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Form, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use ndvi::{ClientConfig, Coordinate, EarthEngineClient, NdviAnalyzer, NdviError, ServiceAccountKey};
use serde_json::{json, Value};

const PRIVATE_KEY: &str = include_str!("fixtures/test_key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/test_key.pub.pem");
const ACCESS_TOKEN: &str = "ya29.test-access-token";

/// Scripted upstream behavior plus a log of what it received.
#[derive(Default)]
struct Upstream {
    reject_token: bool,
    scene: Option<&'static str>,
    ndvi: Option<f64>,
    log: Mutex<Vec<String>>,
}

impl Upstream {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

async fn token(
    State(upstream): State<Arc<Upstream>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    upstream.record("token".to_string());

    let grant_ok = form.get("grant_type").map(String::as_str)
        == Some("urn:ietf:params:oauth:grant-type:jwt-bearer");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
    let signature_ok = form
        .get("assertion")
        .map(|jwt| decode::<Value>(jwt, &key, &validation).is_ok())
        .unwrap_or(false);

    if upstream.reject_token || !grant_ok || !signature_ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid JWT Signature."})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({"access_token": ACCESS_TOKEN, "expires_in": 3599, "token_type": "Bearer"})),
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ACCESS_TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": 401, "message": "Request had invalid authentication credentials.", "status": "UNAUTHENTICATED"}})),
    )
}

async fn algorithms(
    State(upstream): State<Arc<Upstream>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    upstream.record(format!("GET {}", path));
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({"algorithms": []})))
}

async fn compute(
    State(upstream): State<Arc<Upstream>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return unauthorized();
    }

    let root = &body["expression"]["values"]["0"];
    if root.get("dictionaryValue").is_some() {
        upstream.record(format!("POST {} summary", path));
        let ndvi = upstream.ndvi.map(Value::from).unwrap_or(Value::Null);
        return (
            StatusCode::OK,
            Json(json!({"result": {"date": "2024-05-28", "ndvi": ndvi}})),
        );
    }

    upstream.record(format!("POST {} index", path));
    match upstream.scene {
        Some(scene) => (StatusCode::OK, Json(json!({ "result": scene }))),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "Element.get: Parameter 'object' is required.", "status": "INVALID_ARGUMENT"}})),
        ),
    }
}

/// Start the stand-in server and return its base URL.
async fn spawn_upstream(upstream: Arc<Upstream>) -> String {
    let app = Router::new()
        .route("/token", post(token))
        .route("/v1/*path", get(algorithms).post(compute))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn key() -> ServiceAccountKey {
    ServiceAccountKey {
        client_email: "ndvi@ndvi-demo.iam.gserviceaccount.com".to_string(),
        private_key: PRIVATE_KEY.to_string(),
        private_key_id: Some("key-1".to_string()),
        project_id: Some("ndvi-demo".to_string()),
        token_uri: None,
    }
}

fn analyzer(base: &str, config: ClientConfig) -> NdviAnalyzer {
    let config = config
        .with_api_url(base)
        .with_token_url(format!("{}/token", base));
    NdviAnalyzer::new(EarthEngineClient::new(config).unwrap())
}

fn point() -> Coordinate {
    Coordinate::new(41.39, 2.17).unwrap()
}

#[tokio::test]
async fn test_full_lookup() {
    let upstream = Arc::new(Upstream {
        scene: Some("20240528T105619_20240528T110154_T31TDF"),
        ndvi: Some(0.6123),
        ..Default::default()
    });
    let base = spawn_upstream(upstream.clone()).await;

    let result = analyzer(&base, ClientConfig::default())
        .analyze(&key(), point())
        .await
        .unwrap();

    assert_eq!(result.date, "2024-05-28");
    assert_eq!(result.ndvi, 0.6123);

    let log = upstream.log();
    assert_eq!(log.len(), 4);
    assert_eq!(log[0], "token");
    assert!(log[1].starts_with("GET ") && log[1].contains("projects/ndvi-demo/algorithms"));
    assert!(log[2].ends_with("value:compute index"));
    assert!(log[3].ends_with("value:compute summary"));
}

#[tokio::test]
async fn test_lookup_no_data() {
    let upstream = Arc::new(Upstream {
        scene: Some("scene"),
        ndvi: None,
        ..Default::default()
    });
    let base = spawn_upstream(upstream).await;

    let err = analyzer(&base, ClientConfig::default())
        .analyze(&key(), point())
        .await
        .unwrap_err();
    assert!(matches!(err, NdviError::NoData));
}

#[tokio::test]
async fn test_lookup_no_image() {
    let upstream = Arc::new(Upstream::default());
    let base = spawn_upstream(upstream.clone()).await;

    let err = analyzer(&base, ClientConfig::default())
        .analyze(&key(), point())
        .await
        .unwrap_err();
    assert!(matches!(err, NdviError::NoImageFound));
    // The NDVI evaluation is never attempted
    assert!(upstream.log().iter().all(|entry| !entry.ends_with("summary")));
}

#[tokio::test]
async fn test_rejected_token_stops_before_initialize() {
    let upstream = Arc::new(Upstream {
        reject_token: true,
        ..Default::default()
    });
    let base = spawn_upstream(upstream.clone()).await;

    let err = analyzer(&base, ClientConfig::default())
        .analyze(&key(), point())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "GEE Authentication failed: invalid_grant: Invalid JWT Signature."
    );
    assert_eq!(upstream.log(), vec!["token"]);
}

#[tokio::test]
async fn test_project_override() {
    let upstream = Arc::new(Upstream {
        scene: Some("scene"),
        ndvi: Some(0.1),
        ..Default::default()
    });
    let base = spawn_upstream(upstream.clone()).await;

    analyzer(&base, ClientConfig::default().with_project("billing-project"))
        .analyze(&key(), point())
        .await
        .unwrap();

    assert!(upstream
        .log()
        .iter()
        .skip(1)
        .all(|entry| entry.contains("projects/billing-project/")));
}

#[tokio::test]
async fn test_unreachable_token_endpoint() {
    // Nothing listens on port 9 (discard) on loopback in test environments
    let err = analyzer("http://127.0.0.1:9", ClientConfig::default())
        .analyze(&key(), point())
        .await
        .unwrap_err();
    assert!(matches!(err, NdviError::Authentication(_)));
}

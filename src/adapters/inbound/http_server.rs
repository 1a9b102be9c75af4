//! Geolocation HTTP API
//!
//! Axum surface for resolving, creating and deleting geolocation entries.
//! Maps `ResolveError` variants onto the HTTP status contract; every error
//! body is a JSON object with a `detail` field.

use crate::application::ResolverService;
use crate::domain::{Geolocation, ResolveError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Resolution orchestrator shared by all handlers.
    pub resolver: Arc<ResolverService>,
}

impl AppState {
    pub fn new(resolver: Arc<ResolverService>) -> Self {
        Self { resolver }
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        match self {
            ResolveError::InvalidIdentifier => detail_response(
                StatusCode::BAD_REQUEST,
                "Parameter must be Ipv4, Ipv6 or URL value",
            ),
            ResolveError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": violations })),
            )
                .into_response(),
            ResolveError::DuplicateEntry => detail_response(
                StatusCode::BAD_REQUEST,
                "An entry with the same IP or URL already exists.",
            ),
            ResolveError::NotFound => {
                detail_response(StatusCode::NOT_FOUND, "Geolocation not found")
            }
            ResolveError::StoreUnavailable => {
                detail_response(StatusCode::SERVICE_UNAVAILABLE, "Database connection error")
            }
            ResolveError::CreateFailed => detail_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while creating the geolocation entry",
            ),
        }
    }
}

fn detail_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// HTTP server for the geolocation API.
pub struct HttpServer {
    listen_addr: String,
    state: AppState,
}

impl HttpServer {
    pub fn new(listen_addr: String, resolver: Arc<ResolverService>) -> Self {
        Self {
            listen_addr,
            state: AppState::new(resolver),
        }
    }

    /// Build the API router over the given state.
    pub fn router(state: AppState) -> Router {
        Router::new()
            // Liveness probe
            .route("/", get(live_handler))
            // Create entry
            .route("/geolocations", post(create_geolocation_handler))
            // Resolve by ip or url
            .route("/geolocations/:value", get(get_geolocation_handler))
            // Delete by ip or url
            .route("/geolocations/:value", delete(delete_geolocation_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the API server until a shutdown signal arrives.
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = Self::router(self.state.clone());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("geolocation API listening on {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Completes when Ctrl+C or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

// Handler functions

async fn live_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn create_geolocation_handler(
    State(state): State<AppState>,
    Json(record): Json<Geolocation>,
) -> Response {
    match state.resolver.create(record).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_geolocation_handler(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Response {
    match state.resolver.get(&value).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        // The GET contract prefixes the malformed-parameter detail.
        Err(ResolveError::InvalidIdentifier) => detail_response(
            StatusCode::BAD_REQUEST,
            "GET parameter must be Ipv4, Ipv6 or URL value",
        ),
        Err(err) => err.into_response(),
    }
}

async fn delete_geolocation_handler(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Response {
    match state.resolver.delete(&value).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{GeolocationProvider, GeolocationStore};
    use crate::domain::{GeoIdentifier, StoreError, Violation};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    // ===== Test doubles =====

    struct StubStore {
        records: Mutex<Vec<Geolocation>>,
        unavailable: bool,
    }

    impl StubStore {
        fn empty() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                unavailable: false,
            }
        }

        fn with_record(record: Geolocation) -> Self {
            Self {
                records: Mutex::new(vec![record]),
                unavailable: false,
            }
        }

        fn down() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                unavailable: true,
            }
        }
    }

    #[async_trait]
    impl GeolocationStore for StubStore {
        async fn find_by_identifier(
            &self,
            identifier: &GeoIdentifier,
        ) -> Result<Option<Geolocation>, StoreError> {
            if self.unavailable {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .find(|record| {
                    record.ip.as_deref() == Some(identifier.value())
                        || record.url.as_deref() == Some(identifier.value())
                })
                .cloned())
        }

        async fn exists(
            &self,
            ip: Option<&str>,
            url: Option<&str>,
        ) -> Result<bool, StoreError> {
            if self.unavailable {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            let records = self.records.lock().unwrap();
            Ok(records.iter().any(|record| {
                (ip.is_some() && record.ip.as_deref() == ip)
                    || (url.is_some() && record.url.as_deref() == url)
            }))
        }

        async fn insert(&self, record: Geolocation) -> Result<Geolocation, StoreError> {
            if self.unavailable {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn delete_by_identifier(
            &self,
            identifier: &GeoIdentifier,
        ) -> Result<bool, StoreError> {
            if self.unavailable {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|record| {
                record.ip.as_deref() != Some(identifier.value())
                    && record.url.as_deref() != Some(identifier.value())
            });
            Ok(records.len() != before)
        }
    }

    struct StubProvider {
        response: Option<Geolocation>,
    }

    impl StubProvider {
        fn none() -> Self {
            Self { response: None }
        }

        fn with_record(record: Geolocation) -> Self {
            Self {
                response: Some(record),
            }
        }
    }

    #[async_trait]
    impl GeolocationProvider for StubProvider {
        async fn fetch(&self, _value: &str) -> Option<Geolocation> {
            self.response.clone()
        }
    }

    // ===== Helpers =====

    fn sample_record() -> Geolocation {
        Geolocation {
            ip: Some("134.201.250.155".to_string()),
            kind: Some("ipv4".to_string()),
            url: None,
            continent_code: "NA".to_string(),
            continent_name: "North America".to_string(),
            country_code: "US".to_string(),
            country_name: "United States".to_string(),
            region_code: "CA".to_string(),
            region_name: "California".to_string(),
            city: "Los Angeles".to_string(),
            zip: Some("90012".to_string()),
            latitude: 34.0655,
            longitude: -118.2405,
            msa: Some("31100".to_string()),
            dma: Some("803".to_string()),
            radius: None,
            ip_routing_type: Some("fixed".to_string()),
            connection_type: Some("tx".to_string()),
            location: None,
        }
    }

    fn test_app(store: StubStore, provider: StubProvider) -> Router {
        let resolver = Arc::new(ResolverService::new(Arc::new(store), Arc::new(provider)));
        HttpServer::router(AppState::new(resolver))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(payload: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/geolocations")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn delete_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    // ===== Liveness =====

    #[tokio::test]
    async fn test_live_endpoint_returns_no_content() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    // ===== GET /geolocations/:value =====

    #[tokio::test]
    async fn test_get_returns_stored_record() {
        let app = test_app(
            StubStore::with_record(sample_record()),
            StubProvider::none(),
        );

        let response = app
            .oneshot(get_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ip"], "134.201.250.155");
        assert_eq!(body["type"], "ipv4");
        assert_eq!(body["city"], "Los Angeles");
    }

    #[tokio::test]
    async fn test_get_unknown_identifier_returns_not_found() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let response = app
            .oneshot(get_request("/geolocations/10.0.0.1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Geolocation not found");
    }

    #[tokio::test]
    async fn test_get_malformed_identifier_returns_bad_request() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let response = app
            .oneshot(get_request("/geolocations/malformed_value"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "GET parameter must be Ipv4, Ipv6 or URL value");
    }

    #[tokio::test]
    async fn test_get_store_down_returns_service_unavailable() {
        let app = test_app(StubStore::down(), StubProvider::none());

        let response = app
            .oneshot(get_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Database connection error");
    }

    #[tokio::test]
    async fn test_get_store_down_still_serves_provider_result() {
        let app = test_app(
            StubStore::down(),
            StubProvider::with_record(sample_record()),
        );

        let response = app
            .oneshot(get_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ip"], "134.201.250.155");
    }

    #[tokio::test]
    async fn test_get_miss_falls_back_to_provider() {
        let app = test_app(
            StubStore::empty(),
            StubProvider::with_record(sample_record()),
        );

        let response = app
            .oneshot(get_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["city"], "Los Angeles");
    }

    // ===== POST /geolocations =====

    #[tokio::test]
    async fn test_post_creates_record() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let payload = json!({
            "ip": "134.201.250.155",
            "type": "ipv4",
            "url": null,
            "continent_code": "NA",
            "continent_name": "North America",
            "country_code": "US",
            "country_name": "United States",
            "region_code": "CA",
            "region_name": "California",
            "city": "Los Angeles",
            "zip": "90012",
            "latitude": 34.0655,
            "longitude": -118.2405,
            "location": {
                "geoname_id": 5368361,
                "capital": "Washington D.C.",
                "country_flag": "https://assets.ipstack.com/flags/us.svg",
                "country_flag_emoji": "🇺🇸",
                "country_flag_emoji_unicode": "U+1F1FA U+1F1F8",
                "calling_code": "1",
                "is_eu": false,
                "languages": [
                    { "code": "en", "name": "English", "native": "English" }
                ]
            }
        });

        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["ip"], "134.201.250.155");
        assert_eq!(body["location"]["geoname_id"], 5368361);
        assert_eq!(body["location"]["languages"][0]["code"], "en");
    }

    #[tokio::test]
    async fn test_post_without_location_serializes_null() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let payload = json!({
            "ip": "134.201.250.155",
            "type": "ipv4",
            "continent_code": "NA",
            "continent_name": "North America",
            "country_code": "US",
            "country_name": "United States",
            "region_code": "CA",
            "region_name": "California",
            "city": "Los Angeles",
            "latitude": 34.0655,
            "longitude": -118.2405
        });

        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert!(body["location"].is_null());
        assert!(body["url"].is_null());
    }

    #[tokio::test]
    async fn test_post_duplicate_returns_bad_request() {
        let app = test_app(
            StubStore::with_record(sample_record()),
            StubProvider::none(),
        );

        let payload = serde_json::to_value(sample_record()).unwrap();
        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["detail"],
            "An entry with the same IP or URL already exists."
        );
    }

    #[tokio::test]
    async fn test_post_invalid_record_returns_violations() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let mut payload = serde_json::to_value(sample_record()).unwrap();
        payload["city"] = json!("   ");
        payload["latitude"] = json!(95.0);

        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        let violations: Vec<Violation> = serde_json::from_value(body["detail"].clone()).unwrap();
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&Violation::new("city", "cannot be empty or whitespace")));
        assert!(violations.contains(&Violation::new(
            "latitude",
            "Latitude must be between -90 and 90"
        )));
    }

    #[tokio::test]
    async fn test_post_missing_identity_returns_single_violation() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let mut payload = serde_json::to_value(sample_record()).unwrap();
        payload["ip"] = json!(null);
        payload["url"] = json!(null);

        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        let violations: Vec<Violation> = serde_json::from_value(body["detail"].clone()).unwrap();
        assert_eq!(
            violations,
            vec![Violation::new(
                "identity",
                "At least one of 'ip' or 'url' must not be null"
            )]
        );
    }

    #[tokio::test]
    async fn test_post_type_mismatch_rejected_by_extractor() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let mut payload = serde_json::to_value(sample_record()).unwrap();
        payload["latitude"] = json!("invalid_latitude");

        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_post_store_down_returns_internal_error() {
        let app = test_app(StubStore::down(), StubProvider::none());

        let payload = serde_json::to_value(sample_record()).unwrap();
        let response = app.oneshot(post_request(&payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["detail"],
            "An error occurred while creating the geolocation entry"
        );
    }

    // ===== DELETE /geolocations/:value =====

    #[tokio::test]
    async fn test_delete_removes_record() {
        let app = test_app(
            StubStore::with_record(sample_record()),
            StubProvider::none(),
        );

        let response = app
            .clone()
            .oneshot(delete_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Second delete finds nothing.
        let response = app
            .oneshot(delete_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_malformed_identifier_returns_bad_request() {
        let app = test_app(StubStore::empty(), StubProvider::none());

        let response = app
            .oneshot(delete_request("/geolocations/malformed_value"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Parameter must be Ipv4, Ipv6 or URL value");
    }

    #[tokio::test]
    async fn test_delete_store_down_returns_service_unavailable() {
        let app = test_app(StubStore::down(), StubProvider::none());

        let response = app
            .oneshot(delete_request("/geolocations/134.201.250.155"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Database connection error");
    }

    // ===== Server lifecycle =====

    #[tokio::test]
    async fn test_http_server_run_starts_listening() {
        use std::time::Duration;

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let resolver = Arc::new(ResolverService::new(
            Arc::new(StubStore::empty()),
            Arc::new(StubProvider::none()),
        ));
        let server = HttpServer::new(addr.to_string(), resolver);

        let server_handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let result = client
            .get(format!("http://{}/", addr))
            .timeout(Duration::from_secs(2))
            .send()
            .await;

        assert!(result.is_ok());
        let response = result.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        server_handle.abort();
    }
}

//! Redirect integration tests
//!
//! These tests verify that tracking links redirect to the registered
//! destination and record exactly one click per visit.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use clickstat::analytics::{GeoLocation, GeoResolver};
use clickstat::config::{SiteConfig, TrustedProxyMode};
use clickstat::redirect;
use clickstat::state::AppState;
use clickstat::storage::{SqliteStorage, Storage};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::{Layer, ServiceExt};

/// Resolver that places every visitor in the same city
struct FixedResolver;

#[async_trait]
impl GeoResolver for FixedResolver {
    async fn resolve(&self, _ip: &str) -> GeoLocation {
        GeoLocation {
            city: Some("São Paulo".to_string()),
            region: Some("São Paulo".to_string()),
            country: Some("Brazil".to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper layer to inject ConnectInfo for tests
#[derive(Clone)]
struct TestConnectInfoLayer;

impl<S> Layer<S> for TestConnectInfoLayer {
    type Service = TestConnectInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TestConnectInfoMiddleware { inner }
    }
}

#[derive(Clone)]
struct TestConnectInfoMiddleware<S> {
    inner: S,
}

impl<S, B> tower::Service<Request<B>> for TestConnectInfoMiddleware<S>
where
    S: tower::Service<Request<B>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let addr = SocketAddr::from(([127, 0, 0, 1], 12345));
        req.extensions_mut()
            .insert(axum::extract::connect_info::ConnectInfo(addr));

        self.inner.call(req)
    }
}

fn create_app(storage: Arc<dyn Storage>) -> Router {
    let state = Arc::new(AppState::new(
        storage,
        Arc::new(FixedResolver),
        &SiteConfig {
            dedupe_by_url: false,
        },
        TrustedProxyMode::Standard,
    ));

    redirect::create_redirect_router(state).layer(TestConnectInfoLayer)
}

#[tokio::test]
async fn test_redirect_existing_site() {
    let storage = create_test_storage().await;
    let site = storage
        .create_site("Landing", "https://example.com/destination")
        .await
        .unwrap();

    let app = create_app(Arc::clone(&storage));

    let request = Request::builder()
        .uri(format!("/r/{}", site.id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/destination"
    );

    let clicks = storage.list_clicks(site.id).await.unwrap();
    assert_eq!(clicks.len(), 1, "Exactly one click should be recorded");
    assert_eq!(clicks[0].country.as_deref(), Some("Brazil"));
    assert_eq!(clicks[0].ip, "127.0.0.1");
}

#[tokio::test]
async fn test_each_redirect_adds_one_click() {
    let storage = create_test_storage().await;
    let site = storage
        .create_site("Counter", "https://example.com/count")
        .await
        .unwrap();
    let app = create_app(Arc::clone(&storage));

    for expected in 1..=3 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/r/{}", site.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let count = storage.list_clicks(site.id).await.unwrap().len();
        assert_eq!(count, expected);
    }
}

#[tokio::test]
async fn test_redirect_unknown_site_returns_404() {
    let storage = create_test_storage().await;
    let app = create_app(Arc::clone(&storage));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/r/9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(storage.list_clicks(9999).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_redirect_records_forwarded_client() {
    let storage = create_test_storage().await;
    let site = storage
        .create_site("Proxied", "https://example.com/proxied")
        .await
        .unwrap();
    let app = create_app(Arc::clone(&storage));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/r/{}", site.id))
                .header("x-forwarded-for", "203.0.113.50, 10.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let clicks = storage.list_clicks(site.id).await.unwrap();
    assert_eq!(clicks[0].ip, "203.0.113.50");
}

#[tokio::test]
async fn test_redirect_non_numeric_id_is_rejected() {
    let storage = create_test_storage().await;
    let app = create_app(storage);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/r/not-a-number")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_redirect_health_check() {
    let storage = create_test_storage().await;
    let app = create_app(storage);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_redirect_to_unsendable_url_fails_without_recording() {
    let storage = create_test_storage().await;
    // Written straight to storage, bypassing registry validation
    let site = storage
        .create_site("Legacy", "https://x/\u{1}")
        .await
        .unwrap();
    let app = create_app(Arc::clone(&storage));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/r/{}", site.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!({ "error": "internal server error" }));

    assert!(storage.list_clicks(site.id).await.unwrap().is_empty());
}

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{health_check, redirect_to_site};

pub fn create_redirect_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/r/{site_id}", get(redirect_to_site))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

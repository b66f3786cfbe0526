use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::extract_client_ip;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Record a click and send the visitor to the site's destination (302)
pub async fn redirect_to_site(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<i64>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let client_ip = extract_client_ip(&headers, addr.ip(), state.trusted_proxy_mode).to_string();

    let destination = state
        .recorder
        .record_click_and_redirect(site_id, &client_ip)
        .await?;

    let location = HeaderValue::from_bytes(destination.as_bytes()).map_err(|_| {
        AppError::Internal(format!("site {site_id} URL is not a valid Location header"))
    })?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

//! Click ingestion and stats API handlers

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use super::handlers::json_body;
use crate::analytics::{extract_client_ip, SiteStats};
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClickRequest {
    pub site_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub status: &'static str,
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// Record a click without redirecting
pub async fn record_click(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ClickRequest>, JsonRejection>,
) -> AppResult<Json<ClickResponse>> {
    let payload = json_body(payload)?;
    let client_ip = extract_client_ip(&headers, addr.ip(), state.trusted_proxy_mode).to_string();

    let result = state.recorder.record_click(payload.site_id, &client_ip).await?;

    Ok(Json(ClickResponse {
        status: "ok",
        ip: result.ip,
        city: result.city,
        region: result.region,
        country: result.country,
    }))
}

/// Full click history for a site
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<i64>,
) -> AppResult<Json<SiteStats>> {
    let stats = state.stats.get_stats(site_id).await?;
    Ok(Json(stats))
}

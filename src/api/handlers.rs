use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{CreateSiteRequest, Site};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CreateSiteResponse {
    pub status: &'static str,
    pub site_id: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Turn a body that failed to parse into a 400 with the parser's message
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Register a new site
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateSiteResponse>)> {
    let payload = json_body(payload)?;

    let site_id = state
        .registry
        .create_site(payload.name.as_deref(), payload.url.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        Json(CreateSiteResponse {
            status: "ok",
            site_id,
        }),
    ))
}

/// List all registered sites
pub async fn list_sites(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Site>>> {
    let sites = state.registry.list_sites().await?;
    Ok(Json(sites))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

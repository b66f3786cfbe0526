use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the registry, recorder and stats operations.
///
/// Geolocation failures never appear here; they degrade to unknown fields.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StorageError),

    /// Server-side fault; the detail is logged, never sent to the client
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    pub fn site_not_found(site_id: i64) -> Self {
        AppError::NotFound(format!("site {site_id} not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Persistence(_) | AppError::Internal(_) => "internal server error".to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("name is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::site_not_found(9).status_code(), StatusCode::NOT_FOUND);

        let err = AppError::from(StorageError::Other(anyhow::anyhow!("connection reset")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_persistence_body_is_generic() {
        let err = AppError::from(StorageError::Other(anyhow::anyhow!("password=hunter2")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = body_string(response).await;
        assert_eq!(body, r#"{"error":"internal server error"}"#);
        assert!(!body.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_internal_body_is_generic() {
        let err = AppError::Internal("bad Location header for site 3".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_string(err.into_response()).await;
        assert_eq!(body, r#"{"error":"internal server error"}"#);
    }

    #[tokio::test]
    async fn test_validation_body_carries_message() {
        let body = body_string(AppError::Validation("url is required".into()).into_response()).await;
        assert_eq!(body, r#"{"error":"url is required"}"#);
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Body of `POST /api/sites`. Fields are optional so that a missing field
/// surfaces as a validation error instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSiteRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analytics::GeoLocation;

/// A persisted click. `created_at` is Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Click {
    pub id: i64,
    pub site_id: i64,
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub created_at: i64,
}

/// Row to be inserted into `clicks`
#[derive(Debug, Clone)]
pub struct NewClick {
    pub site_id: i64,
    pub ip: String,
    pub geo: GeoLocation,
    pub created_at: i64,
}

/// Public shape of a click in the stats response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickView {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub created_at: String,
}

impl From<Click> for ClickView {
    fn from(click: Click) -> Self {
        let created_at = DateTime::from_timestamp_millis(click.created_at)
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| click.created_at.to_string());

        Self {
            city: click.city,
            region: click.region,
            country: click.country,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_view_renders_rfc3339_millis() {
        let click = Click {
            id: 1,
            site_id: 7,
            ip: "203.0.113.9".to_string(),
            city: Some("Lisbon".to_string()),
            region: None,
            country: Some("Portugal".to_string()),
            created_at: 1_700_000_000_123,
        };

        let view = ClickView::from(click);
        assert_eq!(view.created_at, "2023-11-14T22:13:20.123Z");
        assert_eq!(view.city.as_deref(), Some("Lisbon"));
        assert!(view.region.is_none());
    }
}

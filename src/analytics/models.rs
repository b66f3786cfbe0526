//! Data models for click analytics

use serde::{Deserialize, Serialize};

/// Geographic location derived from an IP address. `None` means unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.city.is_none() && self.region.is_none() && self.country.is_none()
    }
}

/// Values actually used for a recorded click, echoed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickResult {
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// Metadata of the site a stats report belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSummary {
    pub name: String,
    pub url: String,
}

/// Full click history of a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteStats {
    pub site: SiteSummary,
    pub clicks: Vec<crate::models::ClickView>,
    pub total_clicks: usize,
}

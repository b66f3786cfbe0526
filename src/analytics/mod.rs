//! Click analytics: geolocation, client IP extraction, ingestion and stats

pub mod geoip;
pub mod ip_extractor;
pub mod models;
pub mod recorder;
pub mod stats;

pub use geoip::{build_resolver, GeoResolver};
pub use ip_extractor::extract_client_ip;
pub use models::{ClickResult, GeoLocation, SiteStats, SiteSummary};
pub use recorder::ClickRecorder;
pub use stats::StatsAggregator;

use std::sync::Arc;

use crate::analytics::{ClickRecorder, GeoResolver, StatsAggregator};
use crate::config::{SiteConfig, TrustedProxyMode};
use crate::registry::SiteRegistry;
use crate::storage::Storage;

/// Shared by the API and redirect routers. Owns the pooled storage handle
/// through the services; handlers never touch a connection directly.
pub struct AppState {
    pub registry: SiteRegistry,
    pub recorder: ClickRecorder,
    pub stats: StatsAggregator,
    pub trusted_proxy_mode: TrustedProxyMode,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        resolver: Arc<dyn GeoResolver>,
        sites: &SiteConfig,
        trusted_proxy_mode: TrustedProxyMode,
    ) -> Self {
        Self {
            registry: SiteRegistry::new(Arc::clone(&storage), sites.dedupe_by_url),
            recorder: ClickRecorder::new(Arc::clone(&storage), resolver),
            stats: StatsAggregator::new(storage),
            trusted_proxy_mode,
        }
    }
}

//! Per-site click statistics rebuilt from the click log

use std::sync::Arc;
use tracing::error;

use crate::analytics::models::{SiteStats, SiteSummary};
use crate::error::{AppError, AppResult};
use crate::models::ClickView;
use crate::storage::Storage;

pub struct StatsAggregator {
    storage: Arc<dyn Storage>,
}

impl StatsAggregator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Site metadata plus its full click history, most recent first
    pub async fn get_stats(&self, site_id: i64) -> AppResult<SiteStats> {
        let site = self
            .storage
            .get_site(site_id)
            .await
            .map_err(|err| {
                error!(operation = "get_stats", site_id, error = %err, "failed to load site");
                AppError::from(err)
            })?
            .ok_or_else(|| AppError::site_not_found(site_id))?;

        let clicks = self.storage.list_clicks(site_id).await.map_err(|err| {
            error!(operation = "get_stats", site_id, error = %err, "failed to load clicks");
            AppError::from(err)
        })?;

        let clicks: Vec<ClickView> = clicks.into_iter().map(ClickView::from).collect();

        Ok(SiteStats {
            site: SiteSummary {
                name: site.name,
                url: site.url,
            },
            total_clicks: clicks.len(),
            clicks,
        })
    }
}

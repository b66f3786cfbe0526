//! Click ingestion: validate, resolve geolocation, persist

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::analytics::geoip::GeoResolver;
use crate::analytics::models::ClickResult;
use crate::error::{AppError, AppResult};
use crate::models::{NewClick, Site};
use crate::registry::is_redirectable;
use crate::storage::Storage;

/// Millisecond timestamps that never go backwards within this process,
/// even if the wall clock is stepped back.
#[derive(Debug, Default)]
struct ClickClock {
    last: AtomicI64,
}

impl ClickClock {
    fn now(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self.last.fetch_max(now, Ordering::SeqCst);
        prev.max(now)
    }
}

pub struct ClickRecorder {
    storage: Arc<dyn Storage>,
    resolver: Arc<dyn GeoResolver>,
    clock: ClickClock,
}

impl ClickRecorder {
    pub fn new(storage: Arc<dyn Storage>, resolver: Arc<dyn GeoResolver>) -> Self {
        Self {
            storage,
            resolver,
            clock: ClickClock::default(),
        }
    }

    /// Record a click for `site_id` coming from `client_ip`.
    ///
    /// The site must exist; an unknown id is rejected before anything is
    /// written, same as the redirect path.
    pub async fn record_click(&self, site_id: Option<i64>, client_ip: &str) -> AppResult<ClickResult> {
        let site_id = match site_id {
            Some(id) if id > 0 => id,
            _ => return Err(AppError::Validation("site_id is required".to_string())),
        };

        let site = self.load_site(site_id, "record_click").await?;
        self.persist(&site, client_ip, "record_click").await
    }

    /// Record a click and return the site's destination URL for a redirect.
    ///
    /// A stored URL that cannot be sent as a `Location` header fails before
    /// the click is written.
    pub async fn record_click_and_redirect(&self, site_id: i64, client_ip: &str) -> AppResult<String> {
        let site = self.load_site(site_id, "record_click_and_redirect").await?;
        if !is_redirectable(&site.url) {
            error!(site_id, url = %site.url, "stored site URL is not a valid Location header");
            return Err(AppError::Internal(format!(
                "site {site_id} has a URL that cannot be redirected to"
            )));
        }
        self.persist(&site, client_ip, "record_click_and_redirect").await?;
        Ok(site.url)
    }

    async fn load_site(&self, site_id: i64, operation: &'static str) -> AppResult<Site> {
        match self.storage.get_site(site_id).await {
            Ok(Some(site)) => Ok(site),
            Ok(None) => {
                debug!(operation, site_id, "click for unknown site");
                Err(AppError::site_not_found(site_id))
            }
            Err(err) => {
                error!(operation, site_id, error = %err, "failed to load site");
                Err(err.into())
            }
        }
    }

    async fn persist(&self, site: &Site, client_ip: &str, operation: &'static str) -> AppResult<ClickResult> {
        let geo = self.resolver.resolve(client_ip).await;

        let click = NewClick {
            site_id: site.id,
            ip: client_ip.to_string(),
            geo,
            created_at: self.clock.now(),
        };

        let stored = self.storage.insert_click(&click).await.map_err(|err| {
            error!(operation, site_id = site.id, ip = client_ip, error = %err, "failed to persist click");
            AppError::from(err)
        })?;

        debug!(operation, site_id = site.id, click_id = stored.id, ip = client_ip, "click recorded");

        Ok(ClickResult {
            ip: stored.ip,
            city: stored.city,
            region: stored.region,
            country: stored.country,
        })
    }
}

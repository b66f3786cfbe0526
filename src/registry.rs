//! Site registration and listing

use axum::http::HeaderValue;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::Site;
use crate::storage::Storage;

pub struct SiteRegistry {
    storage: Arc<dyn Storage>,
    dedupe_by_url: bool,
}

fn required(field: &str, value: Option<&str>) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

/// Whether `url` can be sent back verbatim in a `Location` header
pub(crate) fn is_redirectable(url: &str) -> bool {
    HeaderValue::from_bytes(url.as_bytes()).is_ok()
}

fn redirect_url(value: Option<&str>) -> AppResult<String> {
    let url = required("url", value)?;
    if !is_redirectable(&url) {
        return Err(AppError::Validation(
            "url contains characters that cannot be used in a redirect".to_string(),
        ));
    }
    Ok(url)
}

impl SiteRegistry {
    pub fn new(storage: Arc<dyn Storage>, dedupe_by_url: bool) -> Self {
        Self {
            storage,
            dedupe_by_url,
        }
    }

    /// Register a site and return its id.
    ///
    /// With URL deduplication enabled an already registered URL returns the
    /// existing id and inserts nothing.
    pub async fn create_site(&self, name: Option<&str>, url: Option<&str>) -> AppResult<i64> {
        let name = required("name", name)?;
        let url = redirect_url(url)?;

        if self.dedupe_by_url {
            if let Some(existing) = self.find_by_url(&url).await? {
                info!(site_id = existing.id, url = %url, "site already registered");
                return Ok(existing.id);
            }
        }

        let site = self.storage.create_site(&name, &url).await.map_err(|err| {
            error!(operation = "create_site", url = %url, error = %err, "failed to create site");
            AppError::from(err)
        })?;

        info!(site_id = site.id, name = %site.name, "site registered");
        Ok(site.id)
    }

    /// Register a site unless its URL is already known. Returns the id and
    /// whether a new row was inserted.
    pub async fn get_or_create_site(&self, name: &str, url: &str) -> AppResult<(i64, bool)> {
        let url = redirect_url(Some(url))?;
        if let Some(existing) = self.find_by_url(&url).await? {
            return Ok((existing.id, false));
        }

        let name = required("name", Some(name))?;
        let site = self.storage.create_site(&name, &url).await.map_err(|err| {
            error!(operation = "get_or_create_site", url = %url, error = %err, "failed to create site");
            AppError::from(err)
        })?;
        Ok((site.id, true))
    }

    pub async fn list_sites(&self) -> AppResult<Vec<Site>> {
        self.storage.list_sites().await.map_err(|err| {
            error!(operation = "list_sites", error = %err, "failed to list sites");
            AppError::from(err)
        })
    }

    pub async fn get_site(&self, site_id: i64) -> AppResult<Site> {
        self.storage
            .get_site(site_id)
            .await
            .map_err(|err| {
                error!(operation = "get_site", site_id, error = %err, "failed to load site");
                AppError::from(err)
            })?
            .ok_or_else(|| AppError::site_not_found(site_id))
    }

    async fn find_by_url(&self, url: &str) -> AppResult<Option<Site>> {
        self.storage.find_site_by_url(url).await.map_err(|err| {
            error!(operation = "find_site_by_url", url, error = %err, "failed to look up site");
            AppError::from(err)
        })
    }
}

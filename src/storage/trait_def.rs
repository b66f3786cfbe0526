use crate::models::{Click, NewClick, Site};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes if missing)
    async fn init(&self) -> Result<()>;

    /// Insert a new site and return it with its generated id
    async fn create_site(&self, name: &str, url: &str) -> StorageResult<Site>;

    /// Get a site by id
    async fn get_site(&self, id: i64) -> StorageResult<Option<Site>>;

    /// Find the first site registered with the given destination URL
    async fn find_site_by_url(&self, url: &str) -> StorageResult<Option<Site>>;

    /// List all sites in storage order
    async fn list_sites(&self) -> StorageResult<Vec<Site>>;

    /// Append a click and return the stored row
    async fn insert_click(&self, click: &NewClick) -> StorageResult<Click>;

    /// All clicks of a site, most recent first
    async fn list_clicks(&self, site_id: i64) -> StorageResult<Vec<Click>>;
}

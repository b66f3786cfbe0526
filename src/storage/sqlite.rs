use crate::models::{Click, NewClick, Site};
use crate::storage::{Storage, StorageResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid SQLite URL '{database_url}'"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                url TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sites_url ON sites(url)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_id INTEGER NOT NULL REFERENCES sites(id),
                ip TEXT NOT NULL,
                city TEXT,
                region TEXT,
                country TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_clicks_site_created ON clicks(site_id, created_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_site(&self, name: &str, url: &str) -> StorageResult<Site> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (name, url)
            VALUES (?, ?)
            RETURNING id, name, url
            "#,
        )
        .bind(name)
        .bind(url)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(site)
    }

    async fn get_site(&self, id: i64) -> StorageResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, url
            FROM sites
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(site)
    }

    async fn find_site_by_url(&self, url: &str) -> StorageResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, url
            FROM sites
            WHERE url = ?
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(site)
    }

    async fn list_sites(&self) -> StorageResult<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, url
            FROM sites
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(sites)
    }

    async fn insert_click(&self, click: &NewClick) -> StorageResult<Click> {
        let row = sqlx::query_as::<_, Click>(
            r#"
            INSERT INTO clicks (site_id, ip, city, region, country, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, site_id, ip, city, region, country, created_at
            "#,
        )
        .bind(click.site_id)
        .bind(&click.ip)
        .bind(click.geo.city.as_deref())
        .bind(click.geo.region.as_deref())
        .bind(click.geo.country.as_deref())
        .bind(click.created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn list_clicks(&self, site_id: i64) -> StorageResult<Vec<Click>> {
        let clicks = sqlx::query_as::<_, Click>(
            r#"
            SELECT id, site_id, ip, city, region, country, created_at
            FROM clicks
            WHERE site_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(site_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(clicks)
    }
}

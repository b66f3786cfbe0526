//! IP geolocation resolvers
//!
//! Every resolver is best-effort: lookups never fail, they degrade to
//! [`GeoLocation::unknown`] and log the reason.

use anyhow::{Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use moka::future::Cache;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::models::GeoLocation;
use crate::config::{GeoIpConfig, GeoIpProvider};

#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Resolve a single client IP. Never fails.
    async fn resolve(&self, ip: &str) -> GeoLocation;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Reasons an upstream lookup produced nothing. Only ever logged.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("upstream rejected lookup: {0}")]
    Rejected(String),
    #[error("malformed payload: {0}")]
    Malformed(&'static str),
}

/// Whether an address can carry a meaningful location.
///
/// Loopback, private, link-local, unspecified and unparseable addresses
/// resolve to unknown without a lookup.
pub fn is_routable(ip: &str) -> bool {
    let Ok(addr) = ip.trim().parse::<IpAddr>() else {
        return false;
    };

    match addr {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_routable(&mapped.to_string());
            }
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

/// HTTP geo-IP service lookup (ipapi.co by default)
pub struct ExternalApiResolver {
    client: reqwest::Client,
    url_template: String,
}

impl ExternalApiResolver {
    /// `url_template` uses `{ip}` as the placeholder,
    /// e.g. `https://ipapi.co/{ip}/json/`
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("clickstat/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for geolocation lookups")?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    async fn fetch(&self, ip: &str) -> Result<GeoLocation, LookupError> {
        let url = self.url_template.replace("{ip}", ip);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let payload: Value = response.json().await?;
        parse_payload(&payload)
    }
}

/// Map a geo-IP JSON payload to a location.
///
/// Understands the ipapi.co shape (`city`, `region`, `country_name`,
/// `error`/`reason`) and the ip-api.com shape (`regionName`, `country`,
/// `status`/`message`).
pub fn parse_payload(payload: &Value) -> Result<GeoLocation, LookupError> {
    if !payload.is_object() {
        return Err(LookupError::Malformed("expected a JSON object"));
    }

    if payload["error"].as_bool() == Some(true) {
        let reason = payload["reason"]
            .as_str()
            .or_else(|| payload["message"].as_str())
            .unwrap_or("unspecified");
        return Err(LookupError::Rejected(reason.to_string()));
    }

    if payload["status"].as_str() == Some("fail") {
        let reason = payload["message"].as_str().unwrap_or("unspecified");
        return Err(LookupError::Rejected(reason.to_string()));
    }

    let text = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| payload[*k].as_str())
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(String::from)
    };

    Ok(GeoLocation {
        city: text(&["city"]),
        region: text(&["region", "regionName"]),
        country: text(&["country_name", "country"]),
    })
}

#[async_trait]
impl GeoResolver for ExternalApiResolver {
    async fn resolve(&self, ip: &str) -> GeoLocation {
        if !is_routable(ip) {
            debug!(ip, "skipping geolocation for non-routable address");
            return GeoLocation::unknown();
        }

        match self.fetch(ip).await {
            Ok(location) => location,
            Err(err) => {
                warn!(ip, error = %err, "geolocation lookup failed");
                GeoLocation::unknown()
            }
        }
    }

    fn name(&self) -> &'static str {
        "external-api"
    }
}

/// Lookup against a local MaxMind GeoLite2/GeoIP2 City database
pub struct MaxMindResolver {
    city_reader: Arc<Reader<Mmap>>,
}

impl MaxMindResolver {
    pub fn new(city_path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(city_path) }
            .with_context(|| format!("Failed to open GeoIP City database at {}", city_path))?;

        Ok(Self {
            city_reader: Arc::new(reader),
        })
    }

    fn lookup(&self, ip: IpAddr) -> GeoLocation {
        let mut location = GeoLocation::unknown();

        if let Ok(result) = self.city_reader.lookup(ip) {
            match result.decode::<geoip2::City>() {
                Ok(Some(city)) => {
                    location.city = city.city.names.english.map(|s| s.to_string());
                    if let Some(subdivision) = city.subdivisions.first() {
                        location.region = subdivision.names.english.map(|s| s.to_string());
                    }
                    location.country = city.country.names.english.map(|s| s.to_string());
                }
                Ok(None) => {}
                Err(err) => debug!(%ip, error = %err, "failed to decode City record"),
            }
        }

        location
    }
}

#[async_trait]
impl GeoResolver for MaxMindResolver {
    async fn resolve(&self, ip: &str) -> GeoLocation {
        match ip.trim().parse::<IpAddr>() {
            Ok(addr) => self.lookup(addr),
            Err(_) => GeoLocation::unknown(),
        }
    }

    fn name(&self) -> &'static str {
        "maxmind"
    }
}

/// Resolver used when geolocation is turned off
pub struct DisabledResolver;

#[async_trait]
impl GeoResolver for DisabledResolver {
    async fn resolve(&self, _ip: &str) -> GeoLocation {
        GeoLocation::unknown()
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// TTL cache in front of another resolver.
///
/// Only resolved locations are cached, so a failed lookup is retried on the
/// next click from that address. Concurrent lookups of one IP share a single
/// upstream call.
pub struct CachedResolver {
    inner: Arc<dyn GeoResolver>,
    cache: Cache<String, GeoLocation>,
}

impl CachedResolver {
    pub fn new(inner: Arc<dyn GeoResolver>, ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl GeoResolver for CachedResolver {
    async fn resolve(&self, ip: &str) -> GeoLocation {
        self.cache
            .optionally_get_with(ip.to_string(), async {
                let location = self.inner.resolve(ip).await;
                (!location.is_unknown()).then_some(location)
            })
            .await
            .unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Build the resolver selected by configuration
pub fn build_resolver(config: &GeoIpConfig) -> Result<Arc<dyn GeoResolver>> {
    let base: Arc<dyn GeoResolver> = match config.provider {
        GeoIpProvider::External => Arc::new(ExternalApiResolver::new(
            &config.api_url,
            Duration::from_secs(config.timeout_secs),
        )?),
        GeoIpProvider::MaxMind => {
            let path = config
                .city_db_path
                .as_deref()
                .context("GEOIP_CITY_DB_PATH is required for the maxmind provider")?;
            Arc::new(MaxMindResolver::new(path)?)
        }
        GeoIpProvider::None => Arc::new(DisabledResolver),
    };

    let resolver: Arc<dyn GeoResolver> = if config.cache_ttl_secs > 0 {
        info!(
            ttl_secs = config.cache_ttl_secs,
            max_entries = config.cache_max_entries,
            "Geolocation cache enabled"
        );
        Arc::new(CachedResolver::new(
            base,
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_entries,
        ))
    } else {
        base
    };

    info!("Geolocation provider: {}", resolver.name());
    Ok(resolver)
}

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    pub geoip: GeoIpConfig,
    pub trusted_proxy_mode: TrustedProxyMode,
    pub sites: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoIpProvider {
    /// HTTP geo-IP service addressed through `api_url`
    External,
    /// Local MaxMind City database
    MaxMind,
    /// Every lookup resolves to unknown
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    pub provider: GeoIpProvider,
    /// URL template; `{ip}` is replaced with the client address
    pub api_url: String,
    pub timeout_secs: u64,
    pub city_db_path: Option<String>,
    /// Lifetime of a cached lookup. Zero disables the cache.
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

/// Which request headers are trusted to carry the original client address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Ignore headers, use the socket peer address
    None,
    /// First entry of X-Forwarded-For, then RFC 7239 Forwarded
    Standard,
    /// CF-Connecting-IP
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Return the existing site instead of inserting when the URL is already registered
    pub dedupe_by_url: bool,
}

impl GeoIpConfig {
    pub const DEFAULT_API_URL: &'static str = "https://ipapi.co/{ip}/json/";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 3;
    pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            provider: GeoIpProvider::External,
            api_url: Self::DEFAULT_API_URL.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            city_db_path: None,
            cache_ttl_secs: 0,
            cache_max_entries: Self::DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_database_backend(value: &str) -> DatabaseBackend {
    match value.to_lowercase().as_str() {
        "postgres" | "postgresql" => DatabaseBackend::Postgres,
        _ => DatabaseBackend::Sqlite,
    }
}

fn parse_geoip_provider(value: &str) -> GeoIpProvider {
    match value.to_lowercase().as_str() {
        "external" | "api" => GeoIpProvider::External,
        "maxmind" | "mmdb" => GeoIpProvider::MaxMind,
        "none" | "disabled" => GeoIpProvider::None,
        other => {
            tracing::warn!(
                "Unknown GEOIP_PROVIDER '{other}', falling back to 'external'. Supported values: external, maxmind, none"
            );
            GeoIpProvider::External
        }
    }
}

fn parse_trusted_proxy_mode(value: &str) -> TrustedProxyMode {
    match value.to_lowercase().as_str() {
        "standard" => TrustedProxyMode::Standard,
        "cloudflare" => TrustedProxyMode::Cloudflare,
        "none" => TrustedProxyMode::None,
        other => {
            tracing::warn!(
                "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'standard'. Supported values: standard, cloudflare, none"
            );
            TrustedProxyMode::Standard
        }
    }
}

fn parse_max_connections(value: &str) -> anyhow::Result<u32> {
    let max_connections = value
        .trim()
        .parse::<u32>()
        .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;
    if max_connections == 0 {
        anyhow::bail!("DATABASE_MAX_CONNECTIONS must be a positive integer, got 0");
    }
    Ok(max_connections)
}

/// An unset variable takes the default; a set but malformed one is an error.
fn parse_optional_u64(key: &str, value: Option<String>, default: u64) -> anyhow::Result<u64> {
    value
        .map(|v| v.trim().parse::<u64>())
        .transpose()
        .with_context(|| format!("{key} must be a whole number"))
        .map(|parsed| parsed.unwrap_or(default))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend = parse_database_backend(&env_or("DATABASE_BACKEND", "sqlite"));
        let database_url = env_or("DATABASE_URL", "sqlite://./clickstat.db");
        let max_connections = parse_max_connections(&env_or("DATABASE_MAX_CONNECTIONS", "5"))?;

        let api_host = env_or("API_HOST", "127.0.0.1");
        let api_port = env_or("API_PORT", "8080")
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let redirect_host = env_or("REDIRECT_HOST", "127.0.0.1");
        let redirect_port = env_or("REDIRECT_PORT", "3000")
            .parse::<u16>()
            .context("REDIRECT_PORT must be a valid port number")?;

        let provider = parse_geoip_provider(&env_or("GEOIP_PROVIDER", "external"));
        let city_db_path = std::env::var("GEOIP_CITY_DB_PATH").ok();
        if provider == GeoIpProvider::MaxMind && city_db_path.is_none() {
            anyhow::bail!("GEOIP_CITY_DB_PATH must be set when GEOIP_PROVIDER=maxmind");
        }

        let geoip = GeoIpConfig {
            provider,
            api_url: env_or("GEOIP_API_URL", GeoIpConfig::DEFAULT_API_URL),
            timeout_secs: parse_optional_u64(
                "GEOIP_TIMEOUT_SECS",
                std::env::var("GEOIP_TIMEOUT_SECS").ok(),
                GeoIpConfig::DEFAULT_TIMEOUT_SECS,
            )?,
            city_db_path,
            cache_ttl_secs: parse_optional_u64(
                "GEOIP_CACHE_TTL_SECS",
                std::env::var("GEOIP_CACHE_TTL_SECS").ok(),
                0,
            )?,
            cache_max_entries: parse_optional_u64(
                "GEOIP_CACHE_MAX_ENTRIES",
                std::env::var("GEOIP_CACHE_MAX_ENTRIES").ok(),
                GeoIpConfig::DEFAULT_CACHE_MAX_ENTRIES,
            )?,
        };

        let trusted_proxy_mode = parse_trusted_proxy_mode(&env_or("TRUSTED_PROXY_MODE", "standard"));

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            geoip,
            trusted_proxy_mode,
            sites: SiteConfig {
                dedupe_by_url: env_flag("SITE_DEDUPE_BY_URL"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_backend() {
        assert_eq!(parse_database_backend("postgres"), DatabaseBackend::Postgres);
        assert_eq!(parse_database_backend("PostgreSQL"), DatabaseBackend::Postgres);
        assert_eq!(parse_database_backend("sqlite"), DatabaseBackend::Sqlite);
        assert_eq!(parse_database_backend("anything"), DatabaseBackend::Sqlite);
    }

    #[test]
    fn test_parse_geoip_provider_falls_back_to_external() {
        assert_eq!(parse_geoip_provider("maxmind"), GeoIpProvider::MaxMind);
        assert_eq!(parse_geoip_provider("NONE"), GeoIpProvider::None);
        assert_eq!(parse_geoip_provider("bogus"), GeoIpProvider::External);
    }

    #[test]
    fn test_parse_trusted_proxy_mode() {
        assert_eq!(parse_trusted_proxy_mode("cloudflare"), TrustedProxyMode::Cloudflare);
        assert_eq!(parse_trusted_proxy_mode("none"), TrustedProxyMode::None);
        assert_eq!(parse_trusted_proxy_mode("weird"), TrustedProxyMode::Standard);
    }

    #[test]
    fn test_geoip_defaults() {
        let geoip = GeoIpConfig::default();
        assert_eq!(geoip.provider, GeoIpProvider::External);
        assert_eq!(geoip.timeout_secs, 3);
        assert_eq!(geoip.cache_ttl_secs, 0);
        assert!(geoip.api_url.contains("{ip}"));
    }

    #[test]
    fn test_parse_max_connections_rejects_zero() {
        assert_eq!(parse_max_connections("5").unwrap(), 5);
        assert_eq!(parse_max_connections(" 12 ").unwrap(), 12);

        let err = parse_max_connections("0").unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
        assert!(parse_max_connections("-1").is_err());
        assert!(parse_max_connections("many").is_err());
    }

    #[test]
    fn test_parse_optional_u64_rejects_malformed_values() {
        assert_eq!(
            parse_optional_u64("GEOIP_CACHE_MAX_ENTRIES", None, 10_000).unwrap(),
            10_000
        );
        assert_eq!(
            parse_optional_u64("GEOIP_CACHE_MAX_ENTRIES", Some("250".to_string()), 10_000).unwrap(),
            250
        );

        let err = parse_optional_u64("GEOIP_CACHE_MAX_ENTRIES", Some("abc".to_string()), 10_000)
            .unwrap_err();
        assert!(err.to_string().contains("GEOIP_CACHE_MAX_ENTRIES"));
        assert!(parse_optional_u64("GEOIP_TIMEOUT_SECS", Some("-3".to_string()), 3).is_err());
    }
}

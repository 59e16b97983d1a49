use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub links: LinksConfig,
    pub reaper: ReaperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Every caller is anonymous
    None,
    /// `X-API-Key` mapped to a user id
    ApiKey,
    /// User id taken from a header set by a trusted proxy
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
    #[serde(default = "AuthConfig::default_user_id_header")]
    pub user_id_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    pub short_code_length: usize,
    pub default_ttl_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    pub interval_secs: u64,
    pub unused_links_ttl_days: i64,
}

impl AuthConfig {
    pub fn default_user_id_header() -> String {
        "x-user-id".to_string()
    }

    pub fn anonymous() -> Self {
        Self {
            mode: AuthMode::None,
            api_keys: Vec::new(),
            user_id_header: Self::default_user_id_header(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_secs: 300,
        }
    }
}

impl ReaperConfig {
    /// Inactivity window in seconds. Fails for a window under one day or one
    /// that does not fit in an `i64`.
    pub fn inactivity_window_secs(&self) -> anyhow::Result<i64> {
        if self.unused_links_ttl_days < 1 {
            bail!(
                "UNUSED_LINKS_TTL_DAYS must be at least 1, got {}",
                self.unused_links_ttl_days
            );
        }

        self.unused_links_ttl_days
            .checked_mul(SECS_PER_DAY)
            .with_context(|| {
                format!(
                    "UNUSED_LINKS_TTL_DAYS of {} days overflows",
                    self.unused_links_ttl_days
                )
            })
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            unused_links_ttl_days: 30,
        }
    }
}

pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Parse `key:user_id` pairs separated by commas.
pub fn parse_api_keys(raw: &str) -> anyhow::Result<Vec<ApiKey>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, user_id) = entry
                .split_once(':')
                .with_context(|| format!("API_KEYS entry '{entry}' is not of the form key:user_id"))?;
            let (key, user_id) = (key.trim(), user_id.trim());
            if key.is_empty() || user_id.is_empty() {
                bail!("API_KEYS entry '{entry}' has an empty key or user id");
            }
            Ok(ApiKey {
                key: key.to_string(),
                user_id: user_id.to_string(),
            })
        })
        .collect()
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./ocelot.db?mode=rwc".to_string());
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("PORT", 8080u16)?;

        let auth_mode = match std::env::var("AUTH_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => AuthMode::None,
            "api_key" | "apikey" => AuthMode::ApiKey,
            "header" => AuthMode::Header,
            other => {
                tracing::warn!(
                    "Unknown AUTH_MODE '{other}', falling back to 'none'. Supported values: none, api_key, header"
                );
                AuthMode::None
            }
        };

        let api_keys = parse_api_keys(&std::env::var("API_KEYS").unwrap_or_default())?;
        if auth_mode == AuthMode::ApiKey && api_keys.is_empty() {
            bail!("API_KEYS must be set when AUTH_MODE=api_key");
        }

        let user_id_header = std::env::var("USER_ID_HEADER")
            .unwrap_or_else(|_| AuthConfig::default_user_id_header());

        let short_code_length = env_or("SHORT_CODE_LENGTH", 6usize)?;

        let default_ttl_secs = match std::env::var("DEFAULT_LINK_TTL_SECS") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .with_context(|| format!("DEFAULT_LINK_TTL_SECS has an invalid value '{raw}'"))?,
            ),
            Err(_) => None,
        };

        let config = Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            auth: AuthConfig {
                mode: auth_mode,
                api_keys,
                user_id_header,
            },
            cache: CacheConfig {
                max_entries: env_or("CACHE_MAX_ENTRIES", 10_000u64)?,
                ttl_secs: env_or("CACHE_TTL_SECS", 300u64)?,
            },
            links: LinksConfig {
                short_code_length,
                default_ttl_secs,
            },
            reaper: ReaperConfig {
                interval_secs: env_or("REAPER_INTERVAL_SECS", 600u64)?,
                unused_links_ttl_days: env_or("UNUSED_LINKS_TTL_DAYS", 30i64)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make links expire or get reaped at once.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.links.short_code_length == 0 {
            bail!("SHORT_CODE_LENGTH must be at least 1");
        }

        if let Some(ttl) = self.links.default_ttl_secs {
            if ttl < 1 {
                bail!("DEFAULT_LINK_TTL_SECS must be at least 1, got {ttl}");
            }
            chrono::Utc::now()
                .timestamp()
                .checked_add(ttl)
                .with_context(|| format!("DEFAULT_LINK_TTL_SECS of {ttl} overflows"))?;
        }

        if self.reaper.interval_secs == 0 {
            bail!("REAPER_INTERVAL_SECS must be at least 1");
        }

        self.reaper.inactivity_window_secs()?;
        Ok(())
    }
}

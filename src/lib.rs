pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod links;
pub mod models;
pub mod reaper;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use cache::MokaResponseCache;
use config::{Config, DatabaseBackend};
use links::{LinkService, LinkServiceConfig};
use storage::{PostgresStorage, SqliteStorage, Storage};

/// Open and initialize the configured link store.
pub async fn connect_storage(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            tracing::info!("Using PostgreSQL storage");
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections)
                    .await?,
            )
        }
    };

    storage.init().await?;
    Ok(storage)
}

/// Build the link service over `storage` with an in-process response cache.
pub fn build_link_service(config: &Config, storage: Arc<dyn Storage>) -> LinkService {
    let cache = Arc::new(MokaResponseCache::new(
        config.cache.max_entries,
        Duration::from_secs(config.cache.ttl_secs),
    ));

    LinkService::new(
        storage,
        cache,
        LinkServiceConfig {
            code_length: config.links.short_code_length,
            default_ttl_secs: config.links.default_ttl_secs,
        },
    )
}

//! Read-through response cache keyed by short code.
//!
//! Values are the computed payloads served for a code (redirect target or
//! stats). Entries age out by TTL; writers may also invalidate a code.

use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use crate::models::LinkStats;

/// Which response a cache entry holds for a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Redirect,
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub short_code: String,
}

impl CacheKey {
    pub fn redirect(short_code: &str) -> Self {
        Self {
            kind: CacheKind::Redirect,
            short_code: short_code.to_string(),
        }
    }

    pub fn stats(short_code: &str) -> Self {
        Self {
            kind: CacheKind::Stats,
            short_code: short_code.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResponse {
    /// Fully qualified destination URL
    Redirect(String),
    Stats(LinkStats),
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>>;

    async fn set(&self, key: CacheKey, value: CachedResponse) -> Result<()>;

    /// Drop every cached response for `short_code`
    async fn invalidate(&self, short_code: &str) -> Result<()>;

    /// TTL applied to entries, advertised to HTTP clients
    fn ttl(&self) -> Duration;
}

/// In-process cache backed by Moka
pub struct MokaResponseCache {
    entries: Cache<CacheKey, CachedResponse>,
    ttl: Duration,
}

impl MokaResponseCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { entries, ttl }
    }
}

#[async_trait]
impl ResponseCache for MokaResponseCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        Ok(self.entries.get(key).await)
    }

    async fn set(&self, key: CacheKey, value: CachedResponse) -> Result<()> {
        self.entries.insert(key, value).await;
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> Result<()> {
        self.entries.invalidate(&CacheKey::redirect(short_code)).await;
        self.entries.invalidate(&CacheKey::stats(short_code)).await;
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

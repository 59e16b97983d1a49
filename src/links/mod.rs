//! Short-link lifecycle: creation, lookup, click accounting and owner edits.

pub mod normalize;
pub mod shortcode;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachedResponse, ResponseCache};
use crate::error::{LinkError, LinkResult};
use crate::models::{CreateLinkRequest, Link, LinkStats};
use crate::storage::{Storage, StorageError};

pub use normalize::normalize;

/// Scheme prepended to every redirect target, whatever the submitted URL used.
pub const REDIRECT_SCHEME: &str = "https://";

/// Upper bound on generate-then-insert rounds for a single creation.
pub const MAX_CODE_ATTEMPTS: usize = 10;

#[derive(Debug, Clone)]
pub struct LinkServiceConfig {
    pub code_length: usize,
    /// Expiry applied to links created without one, in seconds
    pub default_ttl_secs: Option<i64>,
}

impl Default for LinkServiceConfig {
    fn default() -> Self {
        Self {
            code_length: shortcode::DEFAULT_CODE_LENGTH,
            default_ttl_secs: None,
        }
    }
}

pub struct LinkService {
    storage: Arc<dyn Storage>,
    cache: Arc<dyn ResponseCache>,
    config: LinkServiceConfig,
}

impl LinkService {
    pub fn new(
        storage: Arc<dyn Storage>,
        cache: Arc<dyn ResponseCache>,
        config: LinkServiceConfig,
    ) -> Self {
        Self {
            storage,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Shorten `request.original_url`, under the custom alias if one is given.
    pub async fn create(
        &self,
        request: CreateLinkRequest,
        owner_id: Option<&str>,
    ) -> LinkResult<Link> {
        let now = chrono::Utc::now().timestamp();

        if request.original_url.trim().is_empty() {
            return Err(LinkError::Validation("URL cannot be empty".to_string()));
        }

        let expires_at = match request.expires_at {
            Some(exp) if exp <= now => {
                return Err(LinkError::Validation(
                    "expires_at must be in the future".to_string(),
                ));
            }
            Some(exp) => Some(exp),
            None => match self.config.default_ttl_secs {
                Some(ttl) => Some(now.checked_add(ttl).ok_or_else(|| {
                    LinkError::Transient(anyhow::anyhow!("default link TTL of {ttl}s overflows"))
                })?),
                None => None,
            },
        };

        let original_url = normalize(request.original_url.trim());

        let link = match request.custom_alias {
            Some(alias) => {
                self.create_with_alias(&alias, &original_url, owner_id, expires_at)
                    .await?
            }
            None => {
                self.create_with_generated_code(&original_url, owner_id, expires_at)
                    .await?
            }
        };

        info!(short_code = %link.short_code, url = %link.original_url, "created link");
        Ok(link)
    }

    async fn create_with_alias(
        &self,
        alias: &str,
        original_url: &str,
        owner_id: Option<&str>,
        expires_at: Option<i64>,
    ) -> LinkResult<Link> {
        shortcode::validate_alias(alias).map_err(LinkError::Validation)?;

        if self.storage.get(alias).await?.is_some() {
            return Err(LinkError::AliasTaken);
        }

        // A concurrent creator may have won the race since the check above
        let link = self
            .storage
            .create(alias, original_url, owner_id, expires_at)
            .await?;

        Ok(link)
    }

    async fn create_with_generated_code(
        &self,
        original_url: &str,
        owner_id: Option<&str>,
        expires_at: Option<i64>,
    ) -> LinkResult<Link> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = shortcode::generate(self.config.code_length);

            if self.storage.get(&code).await?.is_some() {
                debug!(attempt, short_code = %code, "generated code already in use");
                continue;
            }

            match self
                .storage
                .create(&code, original_url, owner_id, expires_at)
                .await
            {
                Ok(link) => return Ok(link),
                Err(StorageError::Conflict) => {
                    debug!(attempt, short_code = %code, "lost insert race for generated code");
                }
                Err(StorageError::Other(e)) => return Err(LinkError::Transient(e)),
            }
        }

        warn!(
            attempts = MAX_CODE_ATTEMPTS,
            length = self.config.code_length,
            "short code space exhausted"
        );
        Err(LinkError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// All resolvable links whose normalized URL matches `raw_url`.
    pub async fn search(&self, raw_url: &str) -> LinkResult<Vec<Link>> {
        let now = chrono::Utc::now().timestamp();
        let links: Vec<Link> = self
            .storage
            .find_by_original_url(&normalize(raw_url))
            .await?
            .into_iter()
            .filter(|link| link.is_resolvable(now))
            .collect();

        if links.is_empty() {
            return Err(LinkError::NotFound);
        }

        Ok(links)
    }

    /// Resolve a code to its redirect target and count the click.
    ///
    /// Cache hits return without touching the store, so they are not counted.
    pub async fn resolve(&self, short_code: &str) -> LinkResult<String> {
        let key = CacheKey::redirect(short_code);
        if let Some(CachedResponse::Redirect(target)) = self.cached(&key).await {
            return Ok(target);
        }

        let now = chrono::Utc::now().timestamp();
        let link = self
            .storage
            .get(short_code)
            .await?
            .filter(|link| link.is_resolvable(now))
            .ok_or(LinkError::NotFound)?;

        // The row may have been deactivated, expired or purged since the read
        if !self.storage.record_click(short_code).await? {
            return Err(LinkError::NotFound);
        }

        let target = format!("{REDIRECT_SCHEME}{}", link.original_url);

        if self.outlives_cache_entry(&link, now) {
            self.store(key, CachedResponse::Redirect(target.clone()))
                .await;
        }

        Ok(target)
    }

    /// Usage numbers for an active link. Expiry is not checked here.
    pub async fn stats(&self, short_code: &str) -> LinkResult<LinkStats> {
        let key = CacheKey::stats(short_code);
        if let Some(CachedResponse::Stats(stats)) = self.cached(&key).await {
            return Ok(stats);
        }

        let link = self
            .storage
            .get(short_code)
            .await?
            .filter(|link| link.is_active)
            .ok_or(LinkError::NotFound)?;

        let stats = LinkStats::from(&link);
        self.store(key, CachedResponse::Stats(stats.clone())).await;

        Ok(stats)
    }

    /// Repoint a link owned by `owner_id`.
    pub async fn update_url(
        &self,
        short_code: &str,
        owner_id: &str,
        new_url: &str,
    ) -> LinkResult<Link> {
        if new_url.trim().is_empty() {
            return Err(LinkError::Validation("URL cannot be empty".to_string()));
        }

        let link = self
            .storage
            .update_url(short_code, owner_id, &normalize(new_url.trim()))
            .await?
            .ok_or(LinkError::NotFound)?;

        self.evict(short_code).await;
        info!(short_code, url = %link.original_url, "updated link");

        Ok(link)
    }

    /// Soft-delete a link owned by `owner_id`; the reaper purges it after the
    /// grace period.
    pub async fn delete(&self, short_code: &str, owner_id: &str) -> LinkResult<()> {
        if !self.storage.soft_delete(short_code, owner_id).await? {
            return Err(LinkError::NotFound);
        }

        self.evict(short_code).await;
        info!(short_code, "soft-deleted link");

        Ok(())
    }

    /// Redirects are only cached if the link cannot expire while cached.
    fn outlives_cache_entry(&self, link: &Link, now: i64) -> bool {
        let ttl = self.cache.ttl().as_secs() as i64;
        link.expires_at.is_none_or(|exp| exp > now + ttl)
    }

    async fn cached(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(short_code = %key.short_code, error = %e, "cache read failed, falling back to store");
                None
            }
        }
    }

    async fn store(&self, key: CacheKey, value: CachedResponse) {
        if let Err(e) = self.cache.set(key, value).await {
            warn!(error = %e, "cache write failed");
        }
    }

    async fn evict(&self, short_code: &str) {
        if let Err(e) = self.cache.invalidate(short_code).await {
            warn!(short_code, error = %e, "cache invalidation failed");
        }
    }
}

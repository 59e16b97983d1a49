use crate::models::Link;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Persist a new link under `short_code`.
    ///
    /// Fails with [`StorageError::Conflict`] if any row, active or not yet
    /// purged, already holds the code.
    async fn create(
        &self,
        short_code: &str,
        original_url: &str,
        owner_id: Option<&str>,
        expires_at: Option<i64>,
    ) -> StorageResult<Link>;

    /// Get a link by short code regardless of its active/expiry state
    async fn get(&self, short_code: &str) -> Result<Option<Link>>;

    /// All rows whose stored (normalized) URL equals `original_url`
    async fn find_by_original_url(&self, original_url: &str) -> Result<Vec<Link>>;

    /// Atomically bump the click counter and stamp `last_clicked_at` with now,
    /// provided the link is still active and unexpired. Returns false if no
    /// resolvable row holds the code.
    async fn record_click(&self, short_code: &str) -> Result<bool>;

    /// Point an active link owned by `owner_id` at a new URL
    async fn update_url(
        &self,
        short_code: &str,
        owner_id: &str,
        original_url: &str,
    ) -> Result<Option<Link>>;

    /// Deactivate an active link owned by `owner_id` and let it expire after
    /// the soft-delete grace period. Returns false if nothing matched.
    async fn soft_delete(&self, short_code: &str, owner_id: &str) -> Result<bool>;

    /// Delete every row whose `expires_at` lies before `now`
    async fn purge_expired(&self, now: i64) -> Result<u64>;

    /// Delete active rows not clicked (or, if never clicked, created) since `cutoff`
    async fn purge_inactive(&self, cutoff: i64) -> Result<u64>;
}

use crate::models::{Link, SOFT_DELETE_GRACE_SECS};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

const LINK_COLUMNS: &str =
    "short_code, original_url, owner_id, created_at, expires_at, clicks, last_clicked_at, is_active";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        // Every connection to `sqlite::memory:` opens its own database, so an
        // in-memory store is pinned to one connection that never recycles.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect(database_url)
                .await?
        };

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn fetch(&self, short_code: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ?"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                short_code TEXT PRIMARY KEY NOT NULL,
                original_url TEXT NOT NULL,
                owner_id TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                clicks INTEGER NOT NULL DEFAULT 0,
                last_clicked_at INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_original_url ON links(original_url)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_expires_at ON links(expires_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create(
        &self,
        short_code: &str,
        original_url: &str,
        owner_id: Option<&str>,
        expires_at: Option<i64>,
    ) -> StorageResult<Link> {
        let created_at = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, original_url, owner_id, created_at, expires_at, clicks, is_active)
            VALUES (?, ?, ?, ?, ?, 0, 1)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .bind(owner_id)
        .bind(created_at)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        self.fetch(short_code)
            .await?
            .ok_or_else(|| StorageError::Other(anyhow::anyhow!("link {short_code} vanished after insert")))
    }

    async fn get(&self, short_code: &str) -> Result<Option<Link>> {
        self.fetch(short_code).await
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE original_url = ? ORDER BY created_at DESC"
        ))
        .bind(original_url)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn record_click(&self, short_code: &str) -> Result<bool> {
        let clicked_at = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE links
            SET clicks = clicks + 1, last_clicked_at = ?
            WHERE short_code = ?
              AND is_active = 1
              AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(clicked_at)
        .bind(short_code)
        .bind(clicked_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_url(
        &self,
        short_code: &str,
        owner_id: &str,
        original_url: &str,
    ) -> Result<Option<Link>> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET original_url = ?
            WHERE short_code = ? AND owner_id = ? AND is_active = 1
            "#,
        )
        .bind(original_url)
        .bind(short_code)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch(short_code).await
    }

    async fn soft_delete(&self, short_code: &str, owner_id: &str) -> Result<bool> {
        let grace_until = chrono::Utc::now().timestamp() + SOFT_DELETE_GRACE_SECS;

        let result = sqlx::query(
            r#"
            UPDATE links
            SET is_active = 0, expires_at = ?
            WHERE short_code = ? AND owner_id = ? AND is_active = 1
            "#,
        )
        .bind(grace_until)
        .bind(short_code)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM links
            WHERE expires_at IS NOT NULL AND expires_at < ?
            "#,
        )
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn purge_inactive(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM links
            WHERE is_active = 1 AND COALESCE(last_clicked_at, created_at) < ?
            "#,
        )
        .bind(cutoff)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}

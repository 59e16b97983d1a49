use crate::models::{Link, SOFT_DELETE_GRACE_SECS};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

const LINK_COLUMNS: &str =
    "short_code, original_url, owner_id, created_at, expires_at, clicks, last_clicked_at, is_active";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                short_code TEXT PRIMARY KEY,
                original_url TEXT NOT NULL,
                owner_id TEXT,
                created_at BIGINT NOT NULL,
                expires_at BIGINT,
                clicks BIGINT NOT NULL DEFAULT 0,
                last_clicked_at BIGINT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
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

        let row = sqlx::query_as::<_, Link>(&format!(
            r#"
            INSERT INTO links (short_code, original_url, owner_id, created_at, expires_at, clicks, is_active)
            VALUES ($1, $2, $3, $4, $5, 0, TRUE)
            ON CONFLICT (short_code) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(short_code)
        .bind(original_url)
        .bind(owner_id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        row.ok_or(StorageError::Conflict)
    }

    async fn get(&self, short_code: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = $1"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE original_url = $1 ORDER BY created_at DESC"
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
            SET clicks = clicks + 1, last_clicked_at = $1
            WHERE short_code = $2
              AND is_active
              AND (expires_at IS NULL OR expires_at > $1)
            "#,
        )
        .bind(clicked_at)
        .bind(short_code)
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
        let link = sqlx::query_as::<_, Link>(&format!(
            r#"
            UPDATE links
            SET original_url = $1
            WHERE short_code = $2 AND owner_id = $3 AND is_active
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(original_url)
        .bind(short_code)
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn soft_delete(&self, short_code: &str, owner_id: &str) -> Result<bool> {
        let grace_until = chrono::Utc::now().timestamp() + SOFT_DELETE_GRACE_SECS;

        let result = sqlx::query(
            r#"
            UPDATE links
            SET is_active = FALSE, expires_at = $1
            WHERE short_code = $2 AND owner_id = $3 AND is_active
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
            WHERE expires_at IS NOT NULL AND expires_at < $1
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
            WHERE is_active AND COALESCE(last_clicked_at, created_at) < $1
            "#,
        )
        .bind(cutoff)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}

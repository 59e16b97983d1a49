use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How long a soft-deleted link lingers before the reaper may purge it.
pub const SOFT_DELETE_GRACE_SECS: i64 = 6 * 60 * 60;

/// A persisted short link. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub short_code: String,
    pub original_url: String,
    pub owner_id: Option<String>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub clicks: i64,
    pub last_clicked_at: Option<i64>,
    pub is_active: bool,
}

impl Link {
    /// Whether the link may be redirected to at `now`.
    pub fn is_resolvable(&self, now: i64) -> bool {
        self.is_active && self.expires_at.is_none_or(|exp| exp > now)
    }

    /// Whether `owner_id` owns this link. Anonymous links have no owner.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id.as_deref() == Some(owner_id)
    }
}

/// Usage summary served by `GET /links/{code}/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub original_url: String,
    pub created_at: i64,
    pub clicks: i64,
    pub last_clicked_at: Option<i64>,
    pub expires_at: Option<i64>,
}

impl From<&Link> for LinkStats {
    fn from(link: &Link) -> Self {
        Self {
            original_url: link.original_url.clone(),
            created_at: link.created_at,
            clicks: link.clicks,
            last_clicked_at: link.last_clicked_at,
            expires_at: link.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub original_url: String,
    #[serde(default)]
    pub custom_alias: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLinkRequest {
    pub new_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub original_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Profile row. `id` is the auth subject from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub avatar_url: Option<String>,
    pub lightning_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Output of `get_user_stats`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserStatsRow {
    pub completed_sessions: i64,
    pub total_seconds: i64,
    pub total_donated_sats: i64,
    pub accumulated_balance: i64,
}

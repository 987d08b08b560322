use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One line of `get_rankings` output. `total` is seconds or sats depending on the metric.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankingRow {
    pub rank: i64,
    pub user_id: Uuid,
    pub discord_username: Option<String>,
    pub avatar_url: Option<String>,
    pub total: i64,
}

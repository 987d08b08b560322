use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscordPostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pow_session_id: Uuid,
    pub channel_id: String,
    /// `None` while the Discord call for a reserved post is in flight.
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

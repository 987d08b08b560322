use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(
    /// Where a session's pledged sats go once it is completed.
    DonationMode, "donation mode" {
        Solo => "solo",
        Accumulate => "accumulate",
    }
);

text_enum!(SessionStatus, "session status" {
    InProgress => "in_progress",
    Completed => "completed",
    Abandoned => "abandoned",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PowSessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal: String,
    pub planned_duration_seconds: i32,
    pub actual_duration_seconds: Option<i32>,
    #[sqlx(try_from = "String")]
    pub donation_mode: DonationMode,
    pub donation_sats: i64,
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

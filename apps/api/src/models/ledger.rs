use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(LedgerReason, "ledger reason" {
    SessionCompleted => "session_completed",
    Donation => "donation",
});

/// One movement of a user's accumulated-sats balance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccumulatedSatsLogRow {
    pub id: i64,
    pub user_id: Uuid,
    pub delta: i64,
    pub balance_after: i64,
    #[sqlx(try_from = "String")]
    pub reason: LedgerReason,
    pub pow_session_id: Option<Uuid>,
    pub donation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(
    /// What a donation is paid out of.
    DonationSource, "donation source" {
        Session => "session",
        Accumulated => "accumulated",
    }
);

text_enum!(DonationStatus, "donation status" {
    Pending => "pending",
    Paid => "paid",
    Expired => "expired",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DonationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub source: DonationSource,
    pub pow_session_id: Option<Uuid>,
    pub amount_sats: i64,
    pub memo: Option<String>,
    pub payment_request: String,
    pub payment_hash: String,
    #[sqlx(try_from = "String")]
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

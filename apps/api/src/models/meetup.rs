use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(MeetupStatus, "meetup status" {
    Scheduled => "scheduled",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeetupRow {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_participants: Option<i32>,
    #[sqlx(try_from = "String")]
    pub status: MeetupStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Meetup plus its current head count, for list views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeetupSummaryRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meetup: MeetupRow,
    pub participant_count: i64,
}

/// Participant joined with the public parts of their profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantRow {
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub discord_username: Option<String>,
    pub avatar_url: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Raw membership row, as returned by join and check-in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeetupParticipantRow {
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::meetups::validation::MeetupDraft;
use crate::models::meetup::{
    MeetupParticipantRow, MeetupRow, MeetupStatus, MeetupSummaryRow, ParticipantRow,
};

pub async fn list_meetups(
    pool: &PgPool,
    include_past: bool,
) -> Result<Vec<MeetupSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, MeetupSummaryRow>(
        r#"
        SELECT m.*,
               (SELECT COUNT(*) FROM group_meetup_participants p WHERE p.meetup_id = m.id)
                   AS participant_count
        FROM group_meetups m
        WHERE m.status = 'scheduled' AND ($1 OR m.ends_at > now())
        ORDER BY m.starts_at ASC, m.id
        "#,
    )
    .bind(include_past)
    .fetch_all(pool)
    .await
}

pub async fn find_meetup(pool: &PgPool, meetup_id: Uuid) -> Result<Option<MeetupRow>, sqlx::Error> {
    sqlx::query_as::<_, MeetupRow>("SELECT * FROM group_meetups WHERE id = $1")
        .bind(meetup_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_participants(
    pool: &PgPool,
    meetup_id: Uuid,
) -> Result<Vec<ParticipantRow>, sqlx::Error> {
    sqlx::query_as::<_, ParticipantRow>(
        r#"
        SELECT p.meetup_id, p.user_id, u.discord_username, u.avatar_url,
               p.joined_at, p.checked_in_at
        FROM group_meetup_participants p
        JOIN users u ON u.id = p.user_id
        WHERE p.meetup_id = $1
        ORDER BY p.joined_at ASC
        "#,
    )
    .bind(meetup_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_meetup(
    pool: &PgPool,
    organizer_id: Uuid,
    draft: &MeetupDraft,
) -> Result<MeetupRow, sqlx::Error> {
    sqlx::query_as::<_, MeetupRow>(
        r#"
        INSERT INTO group_meetups
            (organizer_id, title, description, location, starts_at, ends_at, max_participants)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(organizer_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.location)
    .bind(draft.starts_at)
    .bind(draft.ends_at)
    .bind(draft.max_participants)
    .fetch_one(pool)
    .await
}

pub async fn update_meetup(
    pool: &PgPool,
    meetup_id: Uuid,
    draft: &MeetupDraft,
) -> Result<MeetupRow, sqlx::Error> {
    sqlx::query_as::<_, MeetupRow>(
        r#"
        UPDATE group_meetups
        SET title = $2, description = $3, location = $4,
            starts_at = $5, ends_at = $6, max_participants = $7, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(meetup_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.location)
    .bind(draft.starts_at)
    .bind(draft.ends_at)
    .bind(draft.max_participants)
    .fetch_one(pool)
    .await
}

pub async fn cancel_meetup(pool: &PgPool, meetup_id: Uuid) -> Result<MeetupRow, sqlx::Error> {
    sqlx::query_as::<_, MeetupRow>(
        r#"
        UPDATE group_meetups
        SET status = 'cancelled', updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(meetup_id)
    .fetch_one(pool)
    .await
}

/// Joins a meetup. The meetup row is locked so concurrent joins see a stable head count.
pub async fn join_meetup(
    pool: &PgPool,
    meetup_id: Uuid,
    user_id: Uuid,
) -> Result<MeetupParticipantRow, AppError> {
    let mut tx = pool.begin().await?;

    let meetup = sqlx::query_as::<_, MeetupRow>(
        "SELECT * FROM group_meetups WHERE id = $1 FOR UPDATE",
    )
    .bind(meetup_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Meetup {meetup_id} not found")))?;

    if meetup.status == MeetupStatus::Cancelled {
        return Err(AppError::Conflict("Meetup has been cancelled".to_string()));
    }
    if meetup.ends_at <= chrono::Utc::now() {
        return Err(AppError::Conflict("Meetup has already ended".to_string()));
    }

    if let Some(max) = meetup.max_participants {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_meetup_participants WHERE meetup_id = $1",
        )
        .bind(meetup_id)
        .fetch_one(&mut *tx)
        .await?;
        if count >= i64::from(max) {
            return Err(AppError::Conflict("Meetup is full".to_string()));
        }
    }

    let participant = sqlx::query_as::<_, MeetupParticipantRow>(
        r#"
        INSERT INTO group_meetup_participants (meetup_id, user_id)
        VALUES ($1, $2)
        RETURNING meetup_id, user_id, joined_at, checked_in_at
        "#,
    )
    .bind(meetup_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Already joined this meetup"))?;

    tx.commit().await?;
    Ok(participant)
}

/// Leaves a meetup. Checked-in attendees stay on the list.
pub async fn leave_meetup(pool: &PgPool, meetup_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM group_meetup_participants
        WHERE meetup_id = $1 AND user_id = $2 AND checked_in_at IS NULL
        "#,
    )
    .bind(meetup_id)
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();

    if deleted > 0 {
        return Ok(());
    }

    let still_there: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM group_meetup_participants WHERE meetup_id = $1 AND user_id = $2)",
    )
    .bind(meetup_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    if still_there {
        Err(AppError::Conflict(
            "Cannot leave a meetup after checking in".to_string(),
        ))
    } else {
        Err(AppError::NotFound("Not a participant of this meetup".to_string()))
    }
}

/// Records a check-in, joining the caller if needed. The first check-in time wins.
pub async fn check_in(
    pool: &PgPool,
    meetup_id: Uuid,
    user_id: Uuid,
) -> Result<MeetupParticipantRow, sqlx::Error> {
    sqlx::query_as::<_, MeetupParticipantRow>(
        r#"
        INSERT INTO group_meetup_participants (meetup_id, user_id, checked_in_at)
        VALUES ($1, $2, now())
        ON CONFLICT (meetup_id, user_id) DO UPDATE
            SET checked_in_at = COALESCE(group_meetup_participants.checked_in_at,
                                         EXCLUDED.checked_in_at)
        RETURNING meetup_id, user_id, joined_at, checked_in_at
        "#,
    )
    .bind(meetup_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

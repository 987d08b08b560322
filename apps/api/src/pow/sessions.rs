use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::discord::DiscordPostRow;
use crate::models::pow::{PowSessionRow, SessionStatus};
use crate::pow::validation::NewSession;

pub async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    new: &NewSession,
) -> Result<PowSessionRow, AppError> {
    sqlx::query_as::<_, PowSessionRow>(
        r#"
        INSERT INTO pow_sessions
            (user_id, goal, planned_duration_seconds, donation_mode, donation_sats)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&new.goal)
    .bind(new.planned_duration_seconds)
    .bind(new.donation_mode.as_str())
    .bind(new.donation_sats)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "You already have a session in progress"))
}

pub async fn list_sessions(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<SessionStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PowSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, PowSessionRow>(
        r#"
        SELECT * FROM pow_sessions
        WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at DESC, id
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Loads a session only if it belongs to `user_id`.
pub async fn find_owned_session(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<Option<PowSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, PowSessionRow>(
        "SELECT * FROM pow_sessions WHERE id = $1 AND user_id = $2",
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Moves an in-progress session to `completed`. `None` if it was not in progress.
pub async fn mark_completed(
    conn: &mut PgConnection,
    user_id: Uuid,
    session_id: Uuid,
    actual_duration_seconds: i32,
) -> Result<Option<PowSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, PowSessionRow>(
        r#"
        UPDATE pow_sessions
        SET status = 'completed', actual_duration_seconds = $3, completed_at = now()
        WHERE id = $1 AND user_id = $2 AND status = 'in_progress'
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .bind(actual_duration_seconds)
    .fetch_optional(&mut *conn)
    .await
}

/// Moves an in-progress session to `abandoned`. `None` if it was not in progress.
pub async fn mark_abandoned(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<Option<PowSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, PowSessionRow>(
        r#"
        UPDATE pow_sessions
        SET status = 'abandoned'
        WHERE id = $1 AND user_id = $2 AND status = 'in_progress'
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Claims the one Discord post a session may have, before anything is sent.
/// A second claim for the same session is a 409.
pub async fn reserve_discord_post(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
    channel_id: &str,
) -> Result<DiscordPostRow, AppError> {
    sqlx::query_as::<_, DiscordPostRow>(
        r#"
        INSERT INTO discord_posts (user_id, pow_session_id, channel_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(session_id)
    .bind(channel_id)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "This session has already been shared"))
}

pub async fn record_discord_message(
    pool: &PgPool,
    post_id: Uuid,
    message_id: &str,
) -> Result<DiscordPostRow, sqlx::Error> {
    sqlx::query_as::<_, DiscordPostRow>(
        "UPDATE discord_posts SET message_id = $2 WHERE id = $1 RETURNING *",
    )
    .bind(post_id)
    .bind(message_id)
    .fetch_one(pool)
    .await
}

/// Drops a reservation whose Discord call failed, so the session can be shared again.
pub async fn release_discord_post(pool: &PgPool, post_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM discord_posts WHERE id = $1 AND message_id IS NULL")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

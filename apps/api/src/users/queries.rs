use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{UserRow, UserStatsRow};
use crate::users::validation::ProfileUpdate;

pub async fn find_user(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Loads the caller's profile; callers that need one get 422 when it has not been created.
pub async fn require_profile(pool: &PgPool, user_id: Uuid) -> Result<UserRow, AppError> {
    find_user(pool, user_id).await?.ok_or_else(|| {
        AppError::UnprocessableEntity("Create your profile before using this feature".to_string())
    })
}

/// Inserts or updates the caller's profile. `Keep` fields leave the stored value alone.
pub async fn upsert_user(
    pool: &PgPool,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> Result<UserRow, AppError> {
    let (keep_discord_id, discord_id) = update.discord_id.as_bind();
    let (keep_username, username) = update.discord_username.as_bind();
    let (keep_avatar, avatar) = update.avatar_url.as_bind();
    let (keep_address, address) = update.lightning_address.as_bind();

    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, discord_id, discord_username, avatar_url, lightning_address)
        VALUES ($1, $3, $5, $7, $9)
        ON CONFLICT (id) DO UPDATE SET
            discord_id        = CASE WHEN $2 THEN users.discord_id ELSE EXCLUDED.discord_id END,
            discord_username  = CASE WHEN $4 THEN users.discord_username ELSE EXCLUDED.discord_username END,
            avatar_url        = CASE WHEN $6 THEN users.avatar_url ELSE EXCLUDED.avatar_url END,
            lightning_address = CASE WHEN $8 THEN users.lightning_address ELSE EXCLUDED.lightning_address END,
            updated_at        = now()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(keep_discord_id)
    .bind(discord_id)
    .bind(keep_username)
    .bind(username)
    .bind(keep_avatar)
    .bind(avatar)
    .bind(keep_address)
    .bind(address)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, "That Discord account is linked to another user")
    })
}

pub async fn user_stats(pool: &PgPool, user_id: Uuid) -> Result<UserStatsRow, sqlx::Error> {
    sqlx::query_as::<_, UserStatsRow>("SELECT * FROM get_user_stats($1)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

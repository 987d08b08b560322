use axum::{extract::State, Extension, Json};
use serde::Serialize;
use tracing::info;

use crate::auth::organizer::is_organizer;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::user::{UserRow, UserStatsRow};
use crate::state::AppState;
use crate::users::queries::{find_user, upsert_user, user_stats};
use crate::users::validation::{validate_profile_update, UpdateProfileRequest};

#[derive(Debug, Serialize)]
pub struct OrganizerStatusResponse {
    pub is_organizer: bool,
}

/// GET /api/v1/users/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserRow>, AppError> {
    let user = find_user(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(user))
}

/// PUT /api/v1/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserRow>, AppError> {
    let update = validate_profile_update(&req)?;
    let user = upsert_user(&state.db, auth.id, &update).await?;
    info!(
        "Profile saved for user {} ({})",
        user.id,
        auth.email.as_deref().unwrap_or("no email")
    );
    Ok(Json(user))
}

/// GET /api/v1/users/me/stats
pub async fn handle_my_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserStatsRow>, AppError> {
    Ok(Json(user_stats(&state.db, auth.id).await?))
}

/// GET /api/v1/users/me/organizer
pub async fn handle_organizer_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<OrganizerStatusResponse>, AppError> {
    let is_organizer = match find_user(&state.db, auth.id).await? {
        Some(user) => is_organizer(&state, &user).await?,
        None => false,
    };
    Ok(Json(OrganizerStatusResponse { is_organizer }))
}

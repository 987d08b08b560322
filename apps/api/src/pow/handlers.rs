//! Axum route handlers for POW sessions.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::discord::CompletionCard;
use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::ledger::accumulated::{balance, credit_session};
use crate::models::discord::DiscordPostRow;
use crate::models::pow::{DonationMode, PowSessionRow, SessionStatus};
use crate::pagination::Pagination;
use crate::pow::sessions::{
    find_owned_session, insert_session, list_sessions, mark_abandoned, mark_completed,
    record_discord_message, release_discord_post, reserve_discord_post,
};
use crate::pow::validation::{
    validate_actual_duration, validate_new_session, validate_share, CompleteSessionRequest,
    CreateSessionRequest, ShareSessionRequest,
};
use crate::state::AppState;
use crate::users::queries::require_profile;

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub status: Option<SessionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CompleteSessionResponse {
    pub session: PowSessionRow,
    /// Accumulated balance after completion; `None` for solo sessions.
    pub accumulated_balance: Option<i64>,
}

/// Picks the error for a session that exists but could not transition.
async fn transition_error(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<AppError, AppError> {
    Ok(
        match find_owned_session(&state.db, user_id, session_id).await? {
            None => AppError::NotFound(format!("Session {session_id} not found")),
            Some(s) => AppError::Conflict(format!("Session is already {}", s.status)),
        },
    )
}

/// POST /api/v1/pow-sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<PowSessionRow>), AppError> {
    let new = validate_new_session(&req)?;
    require_profile(&state.db, auth.id).await?;

    let session = insert_session(&state.db, auth.id, &new).await?;
    info!(
        "User {} started session {} ({}s planned)",
        auth.id, session.id, session.planned_duration_seconds
    );
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/v1/pow-sessions
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppQuery(query): AppQuery<ListSessionsQuery>,
) -> Result<Json<Vec<PowSessionRow>>, AppError> {
    let (limit, offset) = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve()?;
    let sessions = list_sessions(&state.db, auth.id, query.status, limit, offset).await?;
    Ok(Json(sessions))
}

/// GET /api/v1/pow-sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<PowSessionRow>, AppError> {
    let session = find_owned_session(&state.db, auth.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    Ok(Json(session))
}

/// POST /api/v1/pow-sessions/:id/complete
///
/// Completion and the accumulated-sats credit commit in one transaction.
pub async fn handle_complete_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<CompleteSessionRequest>,
) -> Result<Json<CompleteSessionResponse>, AppError> {
    let actual = validate_actual_duration(req.actual_duration_seconds)?;

    let mut tx = state.db.begin().await?;
    let Some(session) = mark_completed(&mut tx, auth.id, id, actual).await? else {
        drop(tx);
        return Err(transition_error(&state, auth.id, id).await?);
    };

    let accumulated_balance = match session.donation_mode {
        DonationMode::Solo => None,
        DonationMode::Accumulate if session.donation_sats > 0 => {
            Some(credit_session(&mut tx, auth.id, session.donation_sats, session.id).await?)
        }
        DonationMode::Accumulate => Some(balance(&mut *tx, auth.id).await?),
    };
    tx.commit().await?;

    info!("User {} completed session {} in {actual}s", auth.id, session.id);
    Ok(Json(CompleteSessionResponse {
        session,
        accumulated_balance,
    }))
}

/// POST /api/v1/pow-sessions/:id/abandon
pub async fn handle_abandon_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<PowSessionRow>, AppError> {
    match mark_abandoned(&state.db, auth.id, id).await? {
        Some(session) => {
            info!("User {} abandoned session {}", auth.id, session.id);
            Ok(Json(session))
        }
        None => Err(transition_error(&state, auth.id, id).await?),
    }
}

/// POST /api/v1/pow-sessions/:id/share
///
/// Posts the completion card to the community channel, once per session.
pub async fn handle_share_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<ShareSessionRequest>,
) -> Result<(StatusCode, Json<DiscordPostRow>), AppError> {
    let (comment, image_url) = validate_share(&req)?;

    let session = find_owned_session(&state.db, auth.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    if session.status != SessionStatus::Completed {
        return Err(AppError::Conflict(
            "Only completed sessions can be shared".to_string(),
        ));
    }

    let user = require_profile(&state.db, auth.id).await?;
    let channel_id = &state.config.discord_channel_id;
    let reservation = reserve_discord_post(&state.db, auth.id, id, channel_id).await?;

    let card = CompletionCard::from_session(
        &session,
        user.discord_username.clone(),
        user.discord_id.clone(),
        comment,
        image_url,
    );

    let message_id = match state.discord.post_card(channel_id, &card).await {
        Ok(message_id) => message_id,
        Err(e) => {
            if let Err(release_err) = release_discord_post(&state.db, reservation.id).await {
                warn!("Could not release Discord post reservation for session {id}: {release_err}");
            }
            return Err(e.into());
        }
    };

    let post = record_discord_message(&state.db, reservation.id, &message_id)
        .await
        .inspect_err(|_| {
            warn!("Session {id} was posted as message {message_id} but the post could not be recorded")
        })?;

    info!("Shared session {} as Discord message {}", id, message_id);
    Ok((StatusCode::CREATED, Json(post)))
}

//! Axum route handlers for group meetups.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::organizer::require_organizer;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::meetups::checkin::{sign_token, verify_token, CheckinTokenError};
use crate::meetups::queries::{
    cancel_meetup, check_in, find_meetup, insert_meetup, join_meetup, leave_meetup,
    list_meetups, list_participants, update_meetup,
};
use crate::meetups::validation::{CreateMeetupRequest, MeetupDraft, UpdateMeetupRequest};
use crate::models::meetup::{
    MeetupParticipantRow, MeetupRow, MeetupStatus, MeetupSummaryRow, ParticipantRow,
};
use crate::state::AppState;
use crate::users::queries::require_profile;

#[derive(Debug, Default, Deserialize)]
pub struct ListMeetupsQuery {
    #[serde(default)]
    pub include_past: bool,
}

#[derive(Debug, Serialize)]
pub struct MeetupDetailResponse {
    pub meetup: MeetupRow,
    pub participants: Vec<ParticipantRow>,
}

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CheckinTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<CheckinTokenError> for AppError {
    fn from(err: CheckinTokenError) -> Self {
        match err {
            CheckinTokenError::InvalidKey => AppError::Internal(anyhow::anyhow!(err)),
            other => AppError::Validation(other.to_string()),
        }
    }
}

async fn load_meetup(state: &AppState, id: Uuid) -> Result<MeetupRow, AppError> {
    find_meetup(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meetup {id} not found")))
}

/// Organizer gate plus ownership of the meetup.
async fn load_owned_meetup(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<MeetupRow, AppError> {
    let organizer = require_organizer(state, auth).await?;
    let meetup = load_meetup(state, id).await?;
    if meetup.organizer_id != organizer.id {
        return Err(AppError::Forbidden);
    }
    Ok(meetup)
}

fn ensure_scheduled(meetup: &MeetupRow) -> Result<(), AppError> {
    if meetup.status == MeetupStatus::Cancelled {
        return Err(AppError::Conflict("Meetup has been cancelled".to_string()));
    }
    Ok(())
}

/// GET /api/v1/meetups
pub async fn handle_list_meetups(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListMeetupsQuery>,
) -> Result<Json<Vec<MeetupSummaryRow>>, AppError> {
    Ok(Json(list_meetups(&state.db, query.include_past).await?))
}

/// GET /api/v1/meetups/:id
pub async fn handle_get_meetup(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MeetupDetailResponse>, AppError> {
    let meetup = load_meetup(&state, id).await?;
    let participants = list_participants(&state.db, id).await?;
    Ok(Json(MeetupDetailResponse {
        meetup,
        participants,
    }))
}

/// POST /api/v1/meetups
pub async fn handle_create_meetup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CreateMeetupRequest>,
) -> Result<(StatusCode, Json<MeetupRow>), AppError> {
    let draft = MeetupDraft::from_create(req);
    draft.validate()?;

    let organizer = require_organizer(&state, &auth).await?;
    let meetup = insert_meetup(&state.db, organizer.id, &draft).await?;
    info!("Organizer {} created meetup {}", organizer.id, meetup.id);
    Ok((StatusCode::CREATED, Json(meetup)))
}

/// PATCH /api/v1/meetups/:id
pub async fn handle_update_meetup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(patch): AppJson<UpdateMeetupRequest>,
) -> Result<Json<MeetupRow>, AppError> {
    let existing = load_owned_meetup(&state, &auth, id).await?;
    ensure_scheduled(&existing)?;

    let draft = MeetupDraft::merge(&existing, patch);
    draft.validate()?;

    Ok(Json(update_meetup(&state.db, id, &draft).await?))
}

/// DELETE /api/v1/meetups/:id
///
/// Cancels rather than deletes, so attendance history survives.
pub async fn handle_cancel_meetup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MeetupRow>, AppError> {
    let existing = load_owned_meetup(&state, &auth, id).await?;
    ensure_scheduled(&existing)?;

    let meetup = cancel_meetup(&state.db, id).await?;
    info!("Meetup {} cancelled by {}", id, auth.id);
    Ok(Json(meetup))
}

/// POST /api/v1/meetups/:id/join
pub async fn handle_join_meetup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(StatusCode, Json<MeetupParticipantRow>), AppError> {
    require_profile(&state.db, auth.id).await?;
    let participant = join_meetup(&state.db, id, auth.id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// DELETE /api/v1/meetups/:id/join
pub async fn handle_leave_meetup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    leave_meetup(&state.db, id, auth.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/meetups/:id/checkin-token
pub async fn handle_checkin_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<CheckinTokenResponse>, AppError> {
    let meetup = load_owned_meetup(&state, &auth, id).await?;
    ensure_scheduled(&meetup)?;

    let now = Utc::now();
    let token = sign_token(
        state.config.checkin_hmac_secret.as_bytes(),
        meetup.id,
        now.timestamp(),
    )?;

    Ok(Json(CheckinTokenResponse {
        token,
        expires_at: now + Duration::seconds(state.config.checkin_token_ttl_secs),
    }))
}

/// POST /api/v1/meetups/:id/checkin
pub async fn handle_checkin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<CheckinRequest>,
) -> Result<Json<MeetupParticipantRow>, AppError> {
    verify_token(
        state.config.checkin_hmac_secret.as_bytes(),
        &req.token,
        id,
        Utc::now().timestamp(),
        state.config.checkin_token_ttl_secs,
    )?;

    let meetup = load_meetup(&state, id).await?;
    ensure_scheduled(&meetup)?;
    require_profile(&state.db, auth.id).await?;

    let participant = check_in(&state.db, id, auth.id).await?;
    info!("User {} checked in to meetup {}", auth.id, id);
    Ok(Json(participant))
}

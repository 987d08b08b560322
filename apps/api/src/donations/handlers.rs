use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::donations::queries::{find_owned_donation, list_donations};
use crate::donations::service::{create_donation, refresh_donation, CreateDonationRequest};
use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::models::donation::DonationRow;
use crate::pagination::Pagination;
use crate::state::AppState;

/// POST /api/v1/donations
pub async fn handle_create_donation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CreateDonationRequest>,
) -> Result<(StatusCode, Json<DonationRow>), AppError> {
    let donation = create_donation(&state, auth.id, &req).await?;
    Ok((StatusCode::CREATED, Json(donation)))
}

/// GET /api/v1/donations
pub async fn handle_list_donations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppQuery(page): AppQuery<Pagination>,
) -> Result<Json<Vec<DonationRow>>, AppError> {
    let (limit, offset) = page.resolve()?;
    Ok(Json(list_donations(&state.db, auth.id, limit, offset).await?))
}

/// GET /api/v1/donations/:id
pub async fn handle_get_donation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DonationRow>, AppError> {
    let donation = find_owned_donation(&state.db, auth.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donation {id} not found")))?;
    Ok(Json(donation))
}

/// POST /api/v1/donations/:id/refresh
pub async fn handle_refresh_donation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DonationRow>, AppError> {
    Ok(Json(refresh_donation(&state, auth.id, id).await?))
}

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::ledger::accumulated::{available_sats, balance, pending_donation_sats, recent_logs};
use crate::models::ledger::AccumulatedSatsLogRow;
use crate::state::AppState;

const RECENT_LOG_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
pub struct AccumulatedSatsResponse {
    pub balance: i64,
    pub pending_donation_sats: i64,
    pub available_sats: i64,
    pub recent_logs: Vec<AccumulatedSatsLogRow>,
}

/// GET /api/v1/accumulated-sats
pub async fn handle_get_accumulated(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AccumulatedSatsResponse>, AppError> {
    let balance = balance(&state.db, auth.id).await?;
    let pending = pending_donation_sats(&state.db, auth.id).await?;
    let recent_logs = recent_logs(&state.db, auth.id, RECENT_LOG_LIMIT).await?;

    Ok(Json(AccumulatedSatsResponse {
        balance,
        pending_donation_sats: pending,
        available_sats: available_sats(balance, pending),
        recent_logs,
    }))
}

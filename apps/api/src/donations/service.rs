//! Donation flow.
//!
//! create: validate source → invoice via wallet → store `pending`.
//! refresh: poll wallet → on PAID a conditional `pending → paid`, and only
//! the caller that wins it debits accumulated sats, in the same transaction.

use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::accumulated::{
    available_sats, balance, deduct_for_donation, pending_donation_sats,
};
use crate::models::donation::{DonationRow, DonationSource, DonationStatus};
use crate::models::pow::{DonationMode, SessionStatus};
use crate::pow::sessions::find_owned_session;
use crate::state::AppState;
use crate::wallet::InvoiceStatus;

use super::queries::{
    find_owned_donation, insert_donation, mark_expired, mark_paid, session_has_paid_donation,
    NewDonation,
};

pub const DEFAULT_MEMO: &str = "POW donation";
const MAX_MEMO_CHARS: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDonationRequest {
    pub source: DonationSource,
    pub pow_session_id: Option<Uuid>,
    pub amount_sats: Option<i64>,
    pub memo: Option<String>,
}

pub fn resolve_memo(memo: Option<&str>) -> Result<String, AppError> {
    match memo.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(DEFAULT_MEMO.to_string()),
        Some(m) if m.chars().count() > MAX_MEMO_CHARS => Err(AppError::Validation(format!(
            "memo must be at most {MAX_MEMO_CHARS} characters"
        ))),
        Some(m) => Ok(m.to_string()),
    }
}

/// Checks a requested accumulated-sats amount against what is still available.
pub fn check_accumulated_amount(amount: Option<i64>, available: i64) -> Result<i64, AppError> {
    let amount = amount.ok_or_else(|| {
        AppError::Validation("amount_sats is required for accumulated donations".to_string())
    })?;
    if amount < 1 {
        return Err(AppError::UnprocessableEntity(
            "amount_sats must be at least 1".to_string(),
        ));
    }
    if amount > available {
        return Err(AppError::UnprocessableEntity(format!(
            "Only {available} accumulated sats are available"
        )));
    }
    Ok(amount)
}

/// Works out the amount for a per-session donation.
async fn session_amount(
    state: &AppState,
    user_id: Uuid,
    session_id: Option<Uuid>,
) -> Result<(Uuid, i64), AppError> {
    let session_id = session_id.ok_or_else(|| {
        AppError::Validation("pow_session_id is required for session donations".to_string())
    })?;
    let session = find_owned_session(&state.db, user_id, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    if session.status != SessionStatus::Completed {
        return Err(AppError::UnprocessableEntity(
            "Session must be completed before donating".to_string(),
        ));
    }
    if session.donation_mode != DonationMode::Solo {
        return Err(AppError::UnprocessableEntity(
            "Session sats go to the accumulated balance".to_string(),
        ));
    }
    if session.donation_sats <= 0 {
        return Err(AppError::UnprocessableEntity(
            "Session has no pledged sats".to_string(),
        ));
    }
    if session_has_paid_donation(&state.db, session_id).await? {
        return Err(AppError::Conflict(
            "Session donation is already paid".to_string(),
        ));
    }
    Ok((session_id, session.donation_sats))
}

pub async fn create_donation(
    state: &AppState,
    user_id: Uuid,
    req: &CreateDonationRequest,
) -> Result<DonationRow, AppError> {
    let memo = resolve_memo(req.memo.as_deref())?;

    let (pow_session_id, amount_sats) = match req.source {
        DonationSource::Session => {
            let (id, amount) = session_amount(state, user_id, req.pow_session_id).await?;
            (Some(id), amount)
        }
        DonationSource::Accumulated => {
            let balance = balance(&state.db, user_id).await?;
            let pending = pending_donation_sats(&state.db, user_id).await?;
            let amount = check_accumulated_amount(req.amount_sats, available_sats(balance, pending))?;
            (None, amount)
        }
    };

    let invoice = state.wallet.create_invoice(amount_sats, &memo).await?;

    let donation = insert_donation(
        &state.db,
        NewDonation {
            user_id,
            source: req.source,
            pow_session_id,
            amount_sats,
            memo: &memo,
            invoice: &invoice,
        },
    )
    .await?;

    info!(
        "Created {} donation {} for {} sats (user {})",
        donation.source, donation.id, donation.amount_sats, user_id
    );
    Ok(donation)
}

/// Polls the wallet for a pending donation and applies the result.
pub async fn refresh_donation(
    state: &AppState,
    user_id: Uuid,
    donation_id: Uuid,
) -> Result<DonationRow, AppError> {
    let donation = find_owned_donation(&state.db, user_id, donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donation {donation_id} not found")))?;

    if donation.status != DonationStatus::Pending {
        return Ok(donation);
    }

    match state.wallet.invoice_status(&donation.payment_request).await? {
        InvoiceStatus::Pending => Ok(donation),
        InvoiceStatus::Expired => {
            let updated = mark_expired(&state.db, donation.id).await?;
            reload_if_none(state, user_id, donation_id, updated).await
        }
        InvoiceStatus::Paid => {
            let mut tx = state.db.begin().await?;
            let Some(paid) = mark_paid(&mut tx, donation.id).await? else {
                drop(tx);
                return reload_if_none(state, user_id, donation_id, None).await;
            };

            if paid.source == DonationSource::Accumulated {
                match deduct_for_donation(&mut tx, user_id, paid.amount_sats, paid.id).await {
                    Ok(_) => {}
                    Err(AppError::UnprocessableEntity(msg)) => {
                        // The invoice is already settled; record it as paid regardless.
                        error!("Paid donation {} could not be deducted: {msg}", paid.id);
                    }
                    Err(e) => return Err(e),
                }
            }
            tx.commit().await?;

            info!(
                "Donation {} paid: {} sats from user {}",
                paid.id, paid.amount_sats, user_id
            );
            Ok(paid)
        }
    }
}

/// A lost conditional update means another request moved the row; return its current state.
async fn reload_if_none(
    state: &AppState,
    user_id: Uuid,
    donation_id: Uuid,
    updated: Option<DonationRow>,
) -> Result<DonationRow, AppError> {
    match updated {
        Some(row) => Ok(row),
        None => find_owned_donation(&state.db, user_id, donation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Donation {donation_id} not found"))),
    }
}

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::donation::{DonationRow, DonationSource};
use crate::wallet::Invoice;

pub struct NewDonation<'a> {
    pub user_id: Uuid,
    pub source: DonationSource,
    pub pow_session_id: Option<Uuid>,
    pub amount_sats: i64,
    pub memo: &'a str,
    pub invoice: &'a Invoice,
}

pub async fn insert_donation(
    pool: &PgPool,
    new: NewDonation<'_>,
) -> Result<DonationRow, AppError> {
    sqlx::query_as::<_, DonationRow>(
        r#"
        INSERT INTO donations
            (user_id, source, pow_session_id, amount_sats, memo, payment_request, payment_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new.user_id)
    .bind(new.source.as_str())
    .bind(new.pow_session_id)
    .bind(new.amount_sats)
    .bind(new.memo)
    .bind(&new.invoice.payment_request)
    .bind(&new.invoice.payment_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Invoice already recorded"))
}

pub async fn find_owned_donation(
    pool: &PgPool,
    user_id: Uuid,
    donation_id: Uuid,
) -> Result<Option<DonationRow>, sqlx::Error> {
    sqlx::query_as::<_, DonationRow>("SELECT * FROM donations WHERE id = $1 AND user_id = $2")
        .bind(donation_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_donations(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<DonationRow>, sqlx::Error> {
    sqlx::query_as::<_, DonationRow>(
        r#"
        SELECT * FROM donations
        WHERE user_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn session_has_paid_donation(pool: &PgPool, session_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM donations WHERE pow_session_id = $1 AND status = 'paid')",
    )
    .bind(session_id)
    .fetch_one(pool)
    .await
}

/// `pending → paid`. Returns `None` when another caller already moved the row;
/// a concurrent caller blocks on the row lock until the winner commits.
pub async fn mark_paid(
    conn: &mut PgConnection,
    donation_id: Uuid,
) -> Result<Option<DonationRow>, AppError> {
    sqlx::query_as::<_, DonationRow>(
        r#"
        UPDATE donations
        SET status = 'paid', paid_at = now()
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(donation_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, "Another donation for this session is already paid")
    })
}

/// `pending → expired`. Returns `None` when the row was no longer pending.
pub async fn mark_expired(
    pool: &PgPool,
    donation_id: Uuid,
) -> Result<Option<DonationRow>, sqlx::Error> {
    sqlx::query_as::<_, DonationRow>(
        r#"
        UPDATE donations
        SET status = 'expired'
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(donation_id)
    .fetch_optional(pool)
    .await
}

//! Accumulated-sats balance reads and the two ledger procedure calls.
//!
//! The procedures lock the balance row, and unique constraints on the log
//! table make both calls idempotent per session/donation. Debit carries an
//! optimistic expected-balance check; on a stale snapshot we re-read and retry.

use sqlx::{Connection, PgConnection, PgExecutor, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{pg_error_code, AppError, PG_BALANCE_CHANGED, PG_INSUFFICIENT_SATS};
use crate::models::ledger::AccumulatedSatsLogRow;

/// Attempts at a debit before giving up on a balance that keeps moving.
const MAX_DEDUCT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeductFailure {
    StaleBalance,
    Insufficient,
    Other,
}

fn classify_deduct_error(code: Option<&str>) -> DeductFailure {
    match code {
        Some(PG_BALANCE_CHANGED) => DeductFailure::StaleBalance,
        Some(PG_INSUFFICIENT_SATS) => DeductFailure::Insufficient,
        _ => DeductFailure::Other,
    }
}

/// Balance minus sats already promised to pending donations, floored at zero.
pub fn available_sats(balance: i64, pending_donation_sats: i64) -> i64 {
    (balance - pending_donation_sats).max(0)
}

pub async fn balance<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT balance FROM accumulated_sats WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
    Ok(balance.unwrap_or(0))
}

/// Sum of pending donations that will be paid out of the accumulated balance.
pub async fn pending_donation_sats(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_sats), 0)::BIGINT
        FROM donations
        WHERE user_id = $1 AND source = 'accumulated' AND status = 'pending'
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn recent_logs(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<AccumulatedSatsLogRow>, sqlx::Error> {
    sqlx::query_as::<_, AccumulatedSatsLogRow>(
        r#"
        SELECT * FROM accumulated_sats_logs
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Credits a completed session's pledge. Runs on the caller's connection so the
/// credit commits together with the session status change.
pub async fn credit_session(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount_sats: i64,
    pow_session_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let new_balance: i64 = sqlx::query_scalar("SELECT add_accumulated_sats($1, $2, $3)")
        .bind(user_id)
        .bind(amount_sats)
        .bind(pow_session_id)
        .fetch_one(&mut *conn)
        .await?;
    info!("Credited {amount_sats} sats to user {user_id} for session {pow_session_id} (balance {new_balance})");
    Ok(new_balance)
}

async fn call_deduct(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount_sats: i64,
    expected_balance: i64,
    donation_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT deduct_accumulated_sats($1, $2, $3, $4)")
        .bind(user_id)
        .bind(amount_sats)
        .bind(expected_balance)
        .bind(donation_id)
        .fetch_one(&mut *conn)
        .await
}

/// Debits a paid donation from the accumulated balance.
///
/// Each attempt runs in a savepoint on `conn`, so a stale snapshot does not
/// poison the caller's transaction.
pub async fn deduct_for_donation(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount_sats: i64,
    donation_id: Uuid,
) -> Result<i64, AppError> {
    for attempt in 1..=MAX_DEDUCT_ATTEMPTS {
        let mut savepoint = conn.begin().await?;
        let expected = balance(&mut *savepoint, user_id).await?;

        match call_deduct(&mut savepoint, user_id, amount_sats, expected, donation_id).await {
            Ok(new_balance) => {
                savepoint.commit().await?;
                info!("Deducted {amount_sats} sats from user {user_id} for donation {donation_id} (balance {new_balance})");
                return Ok(new_balance);
            }
            Err(e) => {
                savepoint.rollback().await?;
                match classify_deduct_error(pg_error_code(&e).as_deref()) {
                    DeductFailure::StaleBalance => {
                        warn!("Accumulated balance for user {user_id} changed during deduction (attempt {attempt})");
                    }
                    DeductFailure::Insufficient => {
                        return Err(AppError::UnprocessableEntity(
                            "Not enough accumulated sats".to_string(),
                        ));
                    }
                    DeductFailure::Other => return Err(AppError::Database(e)),
                }
            }
        }
    }

    Err(AppError::Conflict(
        "Accumulated balance kept changing; try again".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::donation::DonationSource;
    use crate::models::pow::DonationMode;
    use crate::test_support::{seed_balance, seed_completed_session, seed_donation, seed_user};

    #[test]
    fn test_available_sats_floors_at_zero() {
        assert_eq!(available_sats(1000, 300), 700);
        assert_eq!(available_sats(100, 300), 0);
        assert_eq!(available_sats(0, 0), 0);
    }

    #[test]
    fn test_classify_deduct_error() {
        assert_eq!(classify_deduct_error(Some("PW409")), DeductFailure::StaleBalance);
        assert_eq!(classify_deduct_error(Some("PW402")), DeductFailure::Insufficient);
        assert_eq!(classify_deduct_error(Some("23505")), DeductFailure::Other);
        assert_eq!(classify_deduct_error(None), DeductFailure::Other);
    }

    async fn log_count(pool: &PgPool, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM accumulated_sats_logs WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_credit_is_idempotent_per_session(pool: PgPool) {
        let user_id = seed_user(&pool, "alice").await;
        let session = seed_completed_session(&pool, user_id, DonationMode::Accumulate, 500, 600).await;

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(credit_session(&mut conn, user_id, 500, session.id).await.unwrap(), 500);
        assert_eq!(credit_session(&mut conn, user_id, 500, session.id).await.unwrap(), 500);
        drop(conn);

        assert_eq!(balance(&pool, user_id).await.unwrap(), 500);
        assert_eq!(log_count(&pool, user_id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deduct_procedure_checks_snapshot_and_funds(pool: PgPool) {
        let user_id = seed_user(&pool, "bob").await;
        seed_balance(&pool, user_id, 1000).await;
        let donation = seed_donation(&pool, user_id, DonationSource::Accumulated, 400).await;
        let mut conn = pool.acquire().await.unwrap();

        let stale = call_deduct(&mut conn, user_id, 400, 999, donation.id).await.unwrap_err();
        assert_eq!(pg_error_code(&stale).as_deref(), Some(PG_BALANCE_CHANGED));

        let short = call_deduct(&mut conn, user_id, 5000, 1000, donation.id).await.unwrap_err();
        assert_eq!(pg_error_code(&short).as_deref(), Some(PG_INSUFFICIENT_SATS));

        assert_eq!(call_deduct(&mut conn, user_id, 400, 1000, donation.id).await.unwrap(), 600);
        // repeated donation id is a no-op, whatever snapshot is passed
        assert_eq!(call_deduct(&mut conn, user_id, 400, 0, donation.id).await.unwrap(), 600);
        drop(conn);

        assert_eq!(balance(&pool, user_id).await.unwrap(), 600);
        assert_eq!(log_count(&pool, user_id).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deduct_for_donation_recovers_inside_transaction(pool: PgPool) {
        let user_id = seed_user(&pool, "carol").await;
        seed_balance(&pool, user_id, 1000).await;
        let donation = seed_donation(&pool, user_id, DonationSource::Accumulated, 300).await;

        let mut tx = pool.begin().await.unwrap();
        // a failed procedure call rolls back to its savepoint only
        let mut savepoint = tx.begin().await.unwrap();
        assert!(call_deduct(&mut savepoint, user_id, 300, 1, donation.id).await.is_err());
        savepoint.rollback().await.unwrap();

        let new_balance = deduct_for_donation(&mut tx, user_id, 300, donation.id)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(new_balance, 700);
        assert_eq!(balance(&pool, user_id).await.unwrap(), 700);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deduct_for_donation_insufficient_is_unprocessable(pool: PgPool) {
        let user_id = seed_user(&pool, "dave").await;
        seed_balance(&pool, user_id, 100).await;
        let donation = seed_donation(&pool, user_id, DonationSource::Accumulated, 300).await;

        let mut conn = pool.acquire().await.unwrap();
        let err = deduct_for_donation(&mut conn, user_id, 300, donation.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        drop(conn);
        assert_eq!(balance(&pool, user_id).await.unwrap(), 100);
    }
}

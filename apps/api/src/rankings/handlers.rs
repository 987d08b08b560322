use anyhow::anyhow;
use axum::{
    extract::State,
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::extract::AppQuery;
use crate::models::ranking::RankingRow;
use crate::rankings::period::{period_window, RankingMetric, RankingPeriod};
use crate::state::AppState;

const DEFAULT_LIMIT: i32 = 20;
const MAX_LIMIT: i32 = 100;

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    pub metric: Option<RankingMetric>,
    pub period: Option<RankingPeriod>,
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub metric: RankingMetric,
    pub period: RankingPeriod,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub entries: Vec<RankingRow>,
}

pub fn resolve_limit(limit: Option<i32>) -> Result<i32, AppError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(limit)
}

pub async fn fetch_rankings(
    pool: &PgPool,
    metric: RankingMetric,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    limit: i32,
) -> Result<Vec<RankingRow>, sqlx::Error> {
    sqlx::query_as::<_, RankingRow>("SELECT * FROM get_rankings($1, $2, $3, $4)")
        .bind(metric.as_str())
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// GET /api/v1/rankings
///
/// Public. Defaults: metric=time, period=week, limit=20.
pub async fn handle_rankings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RankingsQuery>,
) -> Result<Json<RankingsResponse>, AppError> {
    let metric = query.metric.unwrap_or(RankingMetric::Time);
    let period = query.period.unwrap_or(RankingPeriod::Week);
    let limit = resolve_limit(query.limit)?;

    let offset = FixedOffset::east_opt(state.config.ranking_utc_offset_hours * 3600)
        .ok_or_else(|| AppError::Internal(anyhow!("ranking UTC offset out of range")))?;
    let (from, to) = period_window(period, Utc::now(), offset);

    let entries = fetch_rankings(&state.db, metric, from, to, limit).await?;

    Ok(Json(RankingsResponse {
        metric,
        period,
        from,
        to,
        entries,
    }))
}

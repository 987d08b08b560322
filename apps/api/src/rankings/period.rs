use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::models::text_enum;

text_enum!(RankingMetric, "ranking metric" {
    Time => "time",
    Donation => "donation",
});

text_enum!(RankingPeriod, "ranking period" {
    Week => "week",
    Month => "month",
    All => "all",
});

/// Converts local midnight of `date` in `offset` to a UTC instant.
fn local_midnight_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local: NaiveDateTime = date.and_time(chrono::NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc)
}

/// Half-open `[from, to)` window for a ranking period as seen from `now` in `offset`.
///
/// Weeks start Monday 00:00 local time; months start on the 1st.
pub fn period_window(
    period: RankingPeriod,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&offset).date_naive();
    match period {
        RankingPeriod::Week => {
            let monday =
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            let start = local_midnight_utc(monday, offset);
            (start, start + Duration::days(7))
        }
        RankingPeriod::Month => {
            let first = today - Duration::days(i64::from(today.day0()));
            let past_month_end = first + Duration::days(32);
            let next_first = past_month_end - Duration::days(i64::from(past_month_end.day0()));
            (
                local_midnight_utc(first, offset),
                local_midnight_utc(next_first, offset),
            )
        }
        RankingPeriod::All => (DateTime::<Utc>::UNIX_EPOCH, now + Duration::days(1)),
    }
}

// Leaderboards over study time or donated sats. Aggregation happens in the
// `get_rankings` procedure; this module only cuts the period window.

pub mod handlers;
pub mod period;

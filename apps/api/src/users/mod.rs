// User profiles: the row keyed by the auth subject, linked Discord identity,
// lightning address, and aggregate stats.

pub mod handlers;
pub mod queries;
pub mod validation;

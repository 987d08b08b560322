// POW sessions: start, complete (crediting accumulated sats), abandon, and
// share a completion card to Discord.

pub mod handlers;
pub mod sessions;
pub mod validation;

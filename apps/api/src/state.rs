use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::discord::DiscordApi;
use crate::wallet::LightningWallet;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Bot-token Discord client. Tests swap in a fake.
    pub discord: Arc<dyn DiscordApi>,
    /// Lightning wallet provider used for donation invoices.
    pub wallet: Arc<dyn LightningWallet>,
}

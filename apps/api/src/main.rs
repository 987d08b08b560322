mod auth;
mod config;
mod db;
mod discord;
mod donations;
mod errors;
mod extract;
mod ledger;
mod meetups;
mod models;
mod pagination;
mod pow;
mod rankings;
mod routes;
mod state;
mod users;
mod wallet;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::discord::DiscordClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::wallet::BlinkWallet;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a missing required variable aborts startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting POW Lab API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    if config.run_migrations {
        run_migrations(&db).await?;
    }

    // Outbound clients
    let discord = DiscordClient::new(config.discord_bot_token.clone())?;
    info!("Discord client initialized (guild {})", config.discord_guild_id);

    let wallet = BlinkWallet::new(
        config.blink_api_url.clone(),
        config.blink_api_key.clone(),
        config.blink_wallet_id.clone(),
    )?;
    info!("Lightning wallet client initialized ({})", config.blink_api_url);

    let cors = cors_layer(&config)?;

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        discord: Arc::new(discord),
        wallet: Arc::new(wallet),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Permissive unless `CORS_ALLOWED_ORIGINS` lists the allowed frontends.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let Some(origins) = &config.cors_allowed_origins else {
        return Ok(CorsLayer::permissive());
    };
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    info!("CORS restricted to {} origin(s)", origins.len());
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

use anyhow::{bail, Context, Result};

pub const DEFAULT_BLINK_API_URL: &str = "https://api.blink.sv/graphql";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub auth_jwt_secret: String,
    pub checkin_hmac_secret: String,
    pub checkin_token_ttl_secs: i64,
    pub discord_bot_token: String,
    pub discord_guild_id: String,
    pub discord_channel_id: String,
    pub discord_organizer_role_id: String,
    pub blink_api_url: String,
    pub blink_api_key: Option<String>,
    pub blink_wallet_id: String,
    /// Hours east of UTC used to cut ranking periods.
    pub ranking_utc_offset_hours: i32,
    pub run_migrations: bool,
    /// `None` means permissive CORS.
    pub cors_allowed_origins: Option<Vec<String>>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ranking_utc_offset_hours = optional_env("RANKING_UTC_OFFSET_HOURS")
            .unwrap_or_else(|| "9".to_string())
            .parse::<i32>()
            .context("RANKING_UTC_OFFSET_HOURS must be an integer")?;
        if !(-12..=14).contains(&ranking_utc_offset_hours) {
            bail!("RANKING_UTC_OFFSET_HOURS must be between -12 and 14");
        }

        let checkin_token_ttl_secs = optional_env("CHECKIN_TOKEN_TTL_SECS")
            .unwrap_or_else(|| "300".to_string())
            .parse::<i64>()
            .context("CHECKIN_TOKEN_TTL_SECS must be an integer")?;
        if checkin_token_ttl_secs <= 0 {
            bail!("CHECKIN_TOKEN_TTL_SECS must be positive");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            auth_jwt_secret: require_env("AUTH_JWT_SECRET")?,
            checkin_hmac_secret: require_env("CHECKIN_HMAC_SECRET")?,
            checkin_token_ttl_secs,
            discord_bot_token: require_env("DISCORD_BOT_TOKEN")?,
            discord_guild_id: require_env("DISCORD_GUILD_ID")?,
            discord_channel_id: require_env("DISCORD_CHANNEL_ID")?,
            discord_organizer_role_id: require_env("DISCORD_ORGANIZER_ROLE_ID")?,
            blink_api_url: optional_env("BLINK_API_URL")
                .unwrap_or_else(|| DEFAULT_BLINK_API_URL.to_string()),
            blink_api_key: optional_env("BLINK_API_KEY"),
            blink_wallet_id: require_env("BLINK_WALLET_ID")?,
            ranking_utc_offset_hours,
            run_migrations: parse_bool(
                &optional_env("RUN_MIGRATIONS").unwrap_or_else(|| "true".to_string()),
            )
            .context("RUN_MIGRATIONS must be true or false")?,
            cors_allowed_origins: optional_env("CORS_ALLOWED_ORIGINS")
                .map(|raw| parse_origin_list(&raw))
                .filter(|origins| !origins.is_empty()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean '{other}'"),
    }
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool(" 1 ").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_parse_origin_list_trims_and_drops_empty() {
        let origins = parse_origin_list("https://a.example/, ,https://b.example");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }
}

//! Discord client, the only module that talks to the Discord REST API.
//!
//! Used for two things: posting POW completion cards to the community channel,
//! and reading a member's guild roles for the organizer gate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod cards;

pub use cards::CompletionCard;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
/// Retries after the first attempt, so at most `MAX_RETRIES + 1` requests.
const MAX_RETRIES: u32 = 3;
/// Upper bound on a server-requested `retry_after` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// Operations the service needs from Discord.
///
/// Carried in `AppState` as `Arc<dyn DiscordApi>`.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Posts a completion card and returns the created message id.
    async fn post_card(&self, channel_id: &str, card: &CompletionCard)
        -> Result<String, DiscordError>;

    /// Returns the member's role ids, or `None` if they are not in the guild.
    async fn member_roles(
        &self,
        guild_id: &str,
        discord_user_id: &str,
    ) -> Result<Option<Vec<String>>, DiscordError>;
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Debug, Deserialize)]
struct DiscordErrorBody {
    message: String,
}

/// Bot-token Discord REST client with retry on 429 and 5xx.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    bot_token: String,
    base_url: String,
}

impl DiscordClient {
    pub fn new(bot_token: String) -> Result<Self, DiscordError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            bot_token,
            base_url: DISCORD_API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sends a request built by `build`, retrying on rate limits and server errors.
    /// Returns the final response, which may still carry a 4xx status.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, DiscordError>
    where
        F: Fn(&Client) -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<DiscordError> = None;

        for attempt in 0..=MAX_RETRIES {
            let response = build(&self.client)
                .header("Authorization", format!("Bot {}", self.bot_token))
                .send()
                .await;

            let delay = match response {
                Err(e) => {
                    last_error = Some(DiscordError::Http(e));
                    backoff(attempt)
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let body = response.text().await.unwrap_or_default();
                    let delay = serde_json::from_str::<RateLimitBody>(&body)
                        .ok()
                        .map(|b| retry_after_delay(b.retry_after))
                        .unwrap_or_else(|| backoff(attempt));
                    last_error = Some(DiscordError::RateLimited { retries: attempt });
                    delay
                }
                Ok(response) if response.status().is_server_error() => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!("Discord API returned {}: {}", status, body);
                    last_error = Some(DiscordError::Api {
                        status: status.as_u16(),
                        message: body,
                    });
                    backoff(attempt)
                }
                Ok(response) => return Ok(response),
            };

            if attempt == MAX_RETRIES {
                break;
            }
            warn!(
                "Discord request failed (attempt {}), retrying after {}ms",
                attempt + 1,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        Err(last_error.unwrap_or(DiscordError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl DiscordApi for DiscordClient {
    async fn post_card(
        &self,
        channel_id: &str,
        card: &CompletionCard,
    ) -> Result<String, DiscordError> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let payload = card.to_message_payload();

        let response = self
            .send_with_retry(|client| client.post(&url).json(&payload))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let message: CreatedMessage = response.json().await?;
        debug!("Posted completion card as message {}", message.id);
        Ok(message.id)
    }

    async fn member_roles(
        &self,
        guild_id: &str,
        discord_user_id: &str,
    ) -> Result<Option<Vec<String>>, DiscordError> {
        let url = format!("{}/guilds/{guild_id}/members/{discord_user_id}", self.base_url);

        let response = self.send_with_retry(|client| client.get(&url)).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let member: GuildMember = response.json().await?;
        Ok(Some(member.roles))
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> DiscordError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DiscordErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    DiscordError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Exponential backoff: 500ms, 1s, 2s.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1 << attempt))
}

fn retry_after_delay(retry_after_secs: f64) -> Duration {
    if !retry_after_secs.is_finite() || retry_after_secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(retry_after_secs).min(MAX_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_after_is_clamped() {
        assert_eq!(retry_after_delay(0.25), Duration::from_millis(250));
        assert_eq!(retry_after_delay(3600.0), MAX_RETRY_AFTER);
        assert_eq!(retry_after_delay(-1.0), Duration::ZERO);
        assert_eq!(retry_after_delay(f64::NAN), Duration::ZERO);
    }

    /// Serves a Discord stand-in on a local port that always answers 429.
    async fn rate_limited_server(retry_after: f64) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/channels/:id/messages",
            axum::routing::post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        axum::http::StatusCode::TOO_MANY_REQUESTS,
                        axum::Json(serde_json::json!({ "retry_after": retry_after })),
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), hits)
    }

    fn card() -> CompletionCard {
        CompletionCard {
            goal: "Ship it".to_string(),
            duration_seconds: 1500,
            donation_sats: 0,
            donation_mode: crate::models::pow::DonationMode::Solo,
            display_name: None,
            discord_user_id: None,
            comment: None,
            image_url: None,
            completed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_retries_three_times_without_trailing_sleep() {
        let (base_url, hits) = rate_limited_server(0.5).await;
        let client = DiscordClient::new("token".to_string())
            .unwrap()
            .with_base_url(base_url);

        let started = Instant::now();
        let err = client.post_card("42", &card()).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, DiscordError::RateLimited { retries: 3 }));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_RETRIES + 1);
        // three waits of 500ms between four attempts, none after the last
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1900), "{elapsed:?}");
    }

    #[test]
    fn test_guild_member_roles_default_empty() {
        let member: GuildMember = serde_json::from_str(r#"{"nick": null}"#).unwrap();
        assert!(member.roles.is_empty());
    }
}

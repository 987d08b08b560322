use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::models::pow::{DonationMode, PowSessionRow};

/// Accent colour for completion embeds (bitcoin orange).
const CARD_COLOR: u32 = 0xF7931A;

/// A POW completion card as posted to the community channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCard {
    pub goal: String,
    pub duration_seconds: i32,
    pub donation_sats: i64,
    pub donation_mode: DonationMode,
    pub display_name: Option<String>,
    pub discord_user_id: Option<String>,
    pub comment: Option<String>,
    pub image_url: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionCard {
    pub fn from_session(
        session: &PowSessionRow,
        display_name: Option<String>,
        discord_user_id: Option<String>,
        comment: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            goal: session.goal.clone(),
            duration_seconds: session.actual_duration_seconds.unwrap_or(0),
            donation_sats: session.donation_sats,
            donation_mode: session.donation_mode,
            display_name,
            discord_user_id,
            comment,
            image_url,
            completed_at: session.completed_at.unwrap_or_else(Utc::now),
        }
    }

    /// Builds the JSON body for `POST /channels/{id}/messages`.
    /// Only the card's own author may be pinged. The comment is expected to be
    /// length-checked already.
    pub fn to_message_payload(&self) -> Value {
        let mut fields = vec![
            json!({ "name": "Goal", "value": self.goal, "inline": false }),
            json!({
                "name": "Time",
                "value": format_duration(self.duration_seconds),
                "inline": true
            }),
        ];
        if self.donation_sats > 0 {
            let mode = match self.donation_mode {
                DonationMode::Solo => "donated per session",
                DonationMode::Accumulate => "added to accumulated sats",
            };
            fields.push(json!({
                "name": "Sats",
                "value": format!("{} sats ({mode})", format_sats(self.donation_sats)),
                "inline": true
            }));
        }

        let title = match &self.display_name {
            Some(name) => format!("{name} finished a POW session"),
            None => "POW session finished".to_string(),
        };

        let mut embed = json!({
            "title": title,
            "color": CARD_COLOR,
            "fields": fields,
            "timestamp": self.completed_at.to_rfc3339(),
        });
        if let Some(comment) = &self.comment {
            embed["description"] = json!(comment);
        }
        if let Some(url) = &self.image_url {
            embed["image"] = json!({ "url": url });
        }

        let mut payload = json!({
            "embeds": [embed],
            "allowed_mentions": { "parse": [] },
        });
        if let Some(id) = &self.discord_user_id {
            payload["content"] = json!(format!("<@{id}>"));
            payload["allowed_mentions"] = json!({ "users": [id] });
        }
        payload
    }
}

/// Formats seconds as `1h 30m` or `45m`; anything under a minute shows as `<1m`.
pub fn format_duration(seconds: i32) -> String {
    let total_minutes = seconds.max(0) / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    match (hours, minutes) {
        (0, 0) => "<1m".to_string(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Thousands-separated sats amount, e.g. `21,000`.
pub fn format_sats(sats: i64) -> String {
    let digits = sats.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if sats < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

use serde::Deserialize;

use crate::errors::AppError;

const MAX_DISCORD_USERNAME_CHARS: usize = 32;
const MAX_DISCORD_ID_LEN: usize = 20;
const MAX_URL_LEN: usize = 2048;

/// What to do with one optional profile column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Keep,
    Clear,
    Set(String),
}

impl FieldUpdate {
    /// `(keep_existing, new_value)` as bound into the upsert statement.
    pub fn as_bind(&self) -> (bool, Option<&str>) {
        match self {
            FieldUpdate::Keep => (true, None),
            FieldUpdate::Clear => (false, None),
            FieldUpdate::Set(v) => (false, Some(v.as_str())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub avatar_url: Option<String>,
    pub lightning_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub discord_id: FieldUpdate,
    pub discord_username: FieldUpdate,
    pub avatar_url: FieldUpdate,
    pub lightning_address: FieldUpdate,
}

/// Validates a profile update. Absent fields are kept; empty strings clear.
pub fn validate_profile_update(req: &UpdateProfileRequest) -> Result<ProfileUpdate, AppError> {
    Ok(ProfileUpdate {
        discord_id: field(req.discord_id.as_deref(), "discord_id", is_valid_discord_id)?,
        discord_username: field(
            req.discord_username.as_deref(),
            "discord_username",
            |v| v.chars().count() <= MAX_DISCORD_USERNAME_CHARS,
        )?,
        avatar_url: field(req.avatar_url.as_deref(), "avatar_url", |v| {
            v.starts_with("https://") && v.len() <= MAX_URL_LEN && !v.contains(char::is_whitespace)
        })?,
        lightning_address: field(
            req.lightning_address.as_deref(),
            "lightning_address",
            is_valid_lightning_address,
        )?,
    })
}

fn field(
    raw: Option<&str>,
    name: &str,
    is_valid: impl Fn(&str) -> bool,
) -> Result<FieldUpdate, AppError> {
    let Some(raw) = raw else {
        return Ok(FieldUpdate::Keep);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(FieldUpdate::Clear);
    }
    if !is_valid(value) {
        return Err(AppError::Validation(format!("{name} is invalid")));
    }
    Ok(FieldUpdate::Set(value.to_string()))
}

/// Discord snowflakes are unsigned 64-bit integers rendered in decimal.
pub fn is_valid_discord_id(v: &str) -> bool {
    !v.is_empty() && v.len() <= MAX_DISCORD_ID_LEN && v.bytes().all(|b| b.is_ascii_digit())
}

/// `user@domain.tld`, with a conservative character set for the user part.
pub fn is_valid_lightning_address(v: &str) -> bool {
    let Some((user, domain)) = v.split_once('@') else {
        return false;
    };
    let user_ok = !user.is_empty()
        && user
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'));
    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    user_ok && domain_ok
}

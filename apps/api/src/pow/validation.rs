use serde::Deserialize;

use crate::errors::AppError;
use crate::models::pow::DonationMode;

pub const MAX_GOAL_CHARS: usize = 100;
pub const MAX_PLANNED_MINUTES: i32 = 720;
pub const MAX_DONATION_SATS: i64 = 1_000_000;
pub const MAX_ACTUAL_SECONDS: i32 = 86_400;
const MAX_SHARE_COMMENT_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub goal: String,
    pub planned_duration_minutes: i32,
    pub donation_mode: DonationMode,
    #[serde(default)]
    pub donation_sats: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub goal: String,
    pub planned_duration_seconds: i32,
    pub donation_mode: DonationMode,
    pub donation_sats: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteSessionRequest {
    pub actual_duration_seconds: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareSessionRequest {
    pub comment: Option<String>,
    pub image_url: Option<String>,
}

pub fn validate_new_session(req: &CreateSessionRequest) -> Result<NewSession, AppError> {
    let goal = req.goal.trim();
    if goal.is_empty() {
        return Err(AppError::Validation("goal cannot be empty".to_string()));
    }
    if goal.chars().count() > MAX_GOAL_CHARS {
        return Err(AppError::Validation(format!(
            "goal must be at most {MAX_GOAL_CHARS} characters"
        )));
    }
    if !(1..=MAX_PLANNED_MINUTES).contains(&req.planned_duration_minutes) {
        return Err(AppError::Validation(format!(
            "planned_duration_minutes must be between 1 and {MAX_PLANNED_MINUTES}"
        )));
    }
    if !(0..=MAX_DONATION_SATS).contains(&req.donation_sats) {
        return Err(AppError::Validation(format!(
            "donation_sats must be between 0 and {MAX_DONATION_SATS}"
        )));
    }

    Ok(NewSession {
        goal: goal.to_string(),
        planned_duration_seconds: req.planned_duration_minutes * 60,
        donation_mode: req.donation_mode,
        donation_sats: req.donation_sats,
    })
}

pub fn validate_actual_duration(seconds: i32) -> Result<i32, AppError> {
    if !(1..=MAX_ACTUAL_SECONDS).contains(&seconds) {
        return Err(AppError::Validation(format!(
            "actual_duration_seconds must be between 1 and {MAX_ACTUAL_SECONDS}"
        )));
    }
    Ok(seconds)
}

/// Returns the trimmed `(comment, image_url)`, with blanks dropped.
pub fn validate_share(
    req: &ShareSessionRequest,
) -> Result<(Option<String>, Option<String>), AppError> {
    let comment = req
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if comment.is_some_and(|c| c.chars().count() > MAX_SHARE_COMMENT_CHARS) {
        return Err(AppError::Validation(format!(
            "comment must be at most {MAX_SHARE_COMMENT_CHARS} characters"
        )));
    }

    let image_url = req
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    if image_url.is_some_and(|u| !u.starts_with("https://")) {
        return Err(AppError::Validation(
            "image_url must be an https URL".to_string(),
        ));
    }

    Ok((comment.map(String::from), image_url.map(String::from)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(goal: &str, minutes: i32, sats: i64) -> CreateSessionRequest {
        CreateSessionRequest {
            goal: goal.to_string(),
            planned_duration_minutes: minutes,
            donation_mode: DonationMode::Accumulate,
            donation_sats: sats,
        }
    }

    #[test]
    fn test_valid_session_converts_minutes() {
        let s = validate_new_session(&req("  Rust book ch.4 ", 90, 1000)).unwrap();
        assert_eq!(s.goal, "Rust book ch.4");
        assert_eq!(s.planned_duration_seconds, 5400);
        assert_eq!(s.donation_sats, 1000);
    }

    #[test]
    fn test_goal_bounds() {
        assert!(validate_new_session(&req("   ", 30, 0)).is_err());
        assert!(validate_new_session(&req(&"x".repeat(101), 30, 0)).is_err());
        // counted in chars, not bytes
        assert!(validate_new_session(&req(&"공".repeat(100), 30, 0)).is_ok());
    }

    #[test]
    fn test_duration_and_sats_bounds() {
        assert!(validate_new_session(&req("g", 0, 0)).is_err());
        assert!(validate_new_session(&req("g", 721, 0)).is_err());
        assert!(validate_new_session(&req("g", 720, 0)).is_ok());
        assert!(validate_new_session(&req("g", 30, -1)).is_err());
        assert!(validate_new_session(&req("g", 30, 1_000_001)).is_err());
    }

    #[test]
    fn test_actual_duration_bounds() {
        assert!(validate_actual_duration(0).is_err());
        assert!(validate_actual_duration(86_401).is_err());
        assert_eq!(validate_actual_duration(1800).unwrap(), 1800);
    }

    #[test]
    fn test_donation_sats_defaults_to_zero() {
        let req: CreateSessionRequest = serde_json::from_str(
            r#"{"goal":"g","planned_duration_minutes":25,"donation_mode":"solo"}"#,
        )
        .unwrap();
        assert_eq!(req.donation_sats, 0);
        assert_eq!(req.donation_mode, DonationMode::Solo);
    }

    #[test]
    fn test_share_validation() {
        let ok = ShareSessionRequest {
            comment: Some("  done!  ".to_string()),
            image_url: Some(" ".to_string()),
        };
        assert_eq!(
            validate_share(&ok).unwrap(),
            (Some("done!".to_string()), None)
        );

        let bad = ShareSessionRequest {
            comment: None,
            image_url: Some("ftp://x".to_string()),
        };
        assert!(validate_share(&bad).is_err());
    }
}

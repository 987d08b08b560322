use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::errors::AppError;
use crate::models::meetup::MeetupRow;

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_LOCATION_CHARS: usize = 200;
const MAX_PARTICIPANTS: i32 = 1000;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetupRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_participants: Option<i32>,
}

/// Partial update. `null` clears the optional columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMeetupRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_participants: Option<Option<i32>>,
}

/// A fully-specified meetup ready to insert or write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetupDraft {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_participants: Option<i32>,
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl MeetupDraft {
    pub fn from_create(req: CreateMeetupRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            description: clean(req.description),
            location: clean(req.location),
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            max_participants: req.max_participants,
        }
    }

    /// Applies a partial update on top of the stored meetup.
    pub fn merge(existing: &MeetupRow, patch: UpdateMeetupRequest) -> Self {
        Self {
            title: patch
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| existing.title.clone()),
            description: match patch.description {
                Some(v) => clean(v),
                None => existing.description.clone(),
            },
            location: match patch.location {
                Some(v) => clean(v),
                None => existing.location.clone(),
            },
            starts_at: patch.starts_at.unwrap_or(existing.starts_at),
            ends_at: patch.ends_at.unwrap_or(existing.ends_at),
            max_participants: patch.max_participants.unwrap_or(existing.max_participants),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let title_len = self.title.chars().count();
        if title_len == 0 || title_len > MAX_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "title must be between 1 and {MAX_TITLE_CHARS} characters"
            )));
        }
        if self
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
        {
            return Err(AppError::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        if self
            .location
            .as_ref()
            .is_some_and(|l| l.chars().count() > MAX_LOCATION_CHARS)
        {
            return Err(AppError::Validation(format!(
                "location must be at most {MAX_LOCATION_CHARS} characters"
            )));
        }
        if self.ends_at <= self.starts_at {
            return Err(AppError::Validation(
                "ends_at must be after starts_at".to_string(),
            ));
        }
        if let Some(max) = self.max_participants {
            if !(1..=MAX_PARTICIPANTS).contains(&max) {
                return Err(AppError::Validation(format!(
                    "max_participants must be between 1 and {MAX_PARTICIPANTS}"
                )));
            }
        }
        Ok(())
    }
}

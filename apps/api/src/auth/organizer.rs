use tracing::debug;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;
use crate::users::queries::find_user;

/// True when the member's guild roles include the organizer role.
pub fn has_organizer_role(roles: &[String], organizer_role_id: &str) -> bool {
    roles.iter().any(|r| r == organizer_role_id)
}

/// Checks the organizer role for a profile. No linked Discord account, or not
/// being a guild member, counts as "not an organizer".
pub async fn is_organizer(state: &AppState, user: &UserRow) -> Result<bool, AppError> {
    let Some(discord_id) = user.discord_id.as_deref() else {
        return Ok(false);
    };

    let roles = state
        .discord
        .member_roles(&state.config.discord_guild_id, discord_id)
        .await?;

    let allowed = roles
        .map(|roles| has_organizer_role(&roles, &state.config.discord_organizer_role_id))
        .unwrap_or(false);
    debug!("Organizer check for user {}: {allowed}", user.id);
    Ok(allowed)
}

/// Loads the caller's profile and fails with 403 unless they are an organizer.
pub async fn require_organizer(state: &AppState, auth: &AuthUser) -> Result<UserRow, AppError> {
    let user = find_user(&state.db, auth.id)
        .await?
        .ok_or(AppError::Forbidden)?;

    if is_organizer(state, &user).await? {
        Ok(user)
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state_with, FakeDiscord, FakeWallet};
    use crate::wallet::InvoiceStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn state_with_roles(roles: Option<Vec<String>>) -> AppState {
        test_state_with(
            FakeDiscord {
                roles,
                ..Default::default()
            },
            FakeWallet::with_status(InvoiceStatus::Pending),
        )
    }

    fn user(discord_id: Option<&str>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            discord_id: discord_id.map(String::from),
            discord_username: Some("organizer".to_string()),
            avatar_url: None,
            lightning_address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_is_organizer_with_role() {
        // test config uses "3" as the organizer role
        let state = state_with_roles(Some(vec!["1".to_string(), "3".to_string()]));
        assert!(is_organizer(&state, &user(Some("42"))).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_organizer_without_role_or_membership() {
        let state = state_with_roles(Some(vec!["1".to_string()]));
        assert!(!is_organizer(&state, &user(Some("42"))).await.unwrap());

        let state = state_with_roles(None);
        assert!(!is_organizer(&state, &user(Some("42"))).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_organizer_requires_linked_discord() {
        let state = state_with_roles(Some(vec!["3".to_string()]));
        assert!(!is_organizer(&state, &user(None)).await.unwrap());
    }

    #[test]
    fn test_has_organizer_role() {
        let roles = vec!["111".to_string(), "222".to_string()];
        assert!(has_organizer_role(&roles, "222"));
        assert!(!has_organizer_role(&roles, "333"));
        assert!(!has_organizer_role(&[], "222"));
    }
}

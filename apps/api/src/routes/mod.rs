pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::require_auth;
use crate::donations::handlers as donations;
use crate::ledger::handlers as ledger;
use crate::meetups::handlers as meetups;
use crate::pow::handlers as pow;
use crate::rankings::handlers as rankings;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        // Profile
        .route(
            "/api/v1/users/me",
            get(users::handle_get_me).put(users::handle_update_me),
        )
        .route("/api/v1/users/me/stats", get(users::handle_my_stats))
        .route(
            "/api/v1/users/me/organizer",
            get(users::handle_organizer_status),
        )
        // POW sessions
        .route(
            "/api/v1/pow-sessions",
            post(pow::handle_create_session).get(pow::handle_list_sessions),
        )
        .route("/api/v1/pow-sessions/:id", get(pow::handle_get_session))
        .route(
            "/api/v1/pow-sessions/:id/complete",
            post(pow::handle_complete_session),
        )
        .route(
            "/api/v1/pow-sessions/:id/abandon",
            post(pow::handle_abandon_session),
        )
        .route(
            "/api/v1/pow-sessions/:id/share",
            post(pow::handle_share_session),
        )
        // Accumulated sats
        .route(
            "/api/v1/accumulated-sats",
            get(ledger::handle_get_accumulated),
        )
        // Donations
        .route(
            "/api/v1/donations",
            post(donations::handle_create_donation).get(donations::handle_list_donations),
        )
        .route("/api/v1/donations/:id", get(donations::handle_get_donation))
        .route(
            "/api/v1/donations/:id/refresh",
            post(donations::handle_refresh_donation),
        )
        // Group meetups
        .route(
            "/api/v1/meetups",
            get(meetups::handle_list_meetups).post(meetups::handle_create_meetup),
        )
        .route(
            "/api/v1/meetups/:id",
            get(meetups::handle_get_meetup)
                .patch(meetups::handle_update_meetup)
                .delete(meetups::handle_cancel_meetup),
        )
        .route(
            "/api/v1/meetups/:id/join",
            post(meetups::handle_join_meetup).delete(meetups::handle_leave_meetup),
        )
        .route(
            "/api/v1/meetups/:id/checkin-token",
            get(meetups::handle_checkin_token),
        )
        .route(
            "/api/v1/meetups/:id/checkin",
            post(meetups::handle_checkin),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/rankings", get(rankings::handle_rankings))
        .merge(protected)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::tests::make_token;
    use crate::test_support::test_state;

    async fn send(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let app = build_router(test_state());
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn token() -> String {
        make_token(crate::test_support::JWT_SECRET, Uuid::new_v4(), 3600)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "pow-lab-api");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (status, body) = send(Method::GET, "/api/v1/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_protected_route_rejects_foreign_token() {
        let foreign = make_token("someone-else", Uuid::new_v4(), 3600);
        let (status, _) = send(Method::GET, "/api/v1/accumulated-sats", Some(&foreign), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rankings_is_public_and_validates_limit() {
        let (status, body) = send(Method::GET, "/api/v1/rankings?limit=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_session_validates_before_touching_db() {
        let body = json!({
            "goal": "   ",
            "planned_duration_minutes": 30,
            "donation_mode": "solo"
        });
        let (status, body) =
            send(Method::POST, "/api/v1/pow-sessions", Some(&token()), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "goal cannot be empty");
    }

    #[tokio::test]
    async fn test_profile_update_rejects_bad_lightning_address() {
        let body = json!({ "lightning_address": "not-an-address" });
        let (status, body) = send(Method::PUT, "/api/v1/users/me", Some(&token()), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "lightning_address is invalid");
    }

    #[tokio::test]
    async fn test_donation_rejects_long_memo() {
        let body = json!({ "source": "accumulated", "amount_sats": 10, "memo": "m".repeat(201) });
        let (status, _) = send(Method::POST, "/api/v1/donations", Some(&token()), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_meetup_rejects_inverted_times() {
        let body = json!({
            "title": "Study jam",
            "starts_at": "2030-01-01T12:00:00Z",
            "ends_at": "2030-01-01T10:00:00Z"
        });
        let (status, body) = send(Method::POST, "/api/v1/meetups", Some(&token()), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "ends_at must be after starts_at");
    }

    #[tokio::test]
    async fn test_checkin_rejects_forged_token() {
        let meetup = Uuid::new_v4();
        let forged = crate::meetups::checkin::sign_token(
            b"wrong-secret",
            meetup,
            chrono::Utc::now().timestamp(),
        )
        .unwrap();
        let (status, body) = send(
            Method::POST,
            &format!("/api/v1/meetups/{meetup}/checkin"),
            Some(&token()),
            Some(json!({ "token": forged })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "check-in token signature is invalid");
    }

    #[tokio::test]
    async fn test_bad_path_id_uses_error_envelope() {
        let (status, body) = send(
            Method::GET,
            "/api/v1/pow-sessions/not-a-uuid",
            Some(&token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_body_missing_field_uses_error_envelope() {
        let body = json!({ "goal": "Read" });
        let (status, body) =
            send(Method::POST, "/api/v1/pow-sessions", Some(&token()), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_bad_query_uses_error_envelope() {
        let (status, body) = send(Method::GET, "/api/v1/rankings?metric=karma", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

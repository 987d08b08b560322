//! Request extractors whose rejections render as `AppError`, so malformed
//! bodies, queries and path ids get the same JSON error envelope as
//! handler errors.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;

use crate::errors::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Well-formed JSON of the wrong shape stays a 422; everything else is a 400.
fn rejection_error(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        AppError::UnprocessableEntity(message)
    } else {
        AppError::Validation(message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejection_error(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_mapping() {
        assert!(matches!(
            rejection_error(StatusCode::UNPROCESSABLE_ENTITY, "missing field".to_string()),
            AppError::UnprocessableEntity(_)
        ));
        assert!(matches!(
            rejection_error(StatusCode::BAD_REQUEST, "bad json".to_string()),
            AppError::Validation(_)
        ));
    }
}

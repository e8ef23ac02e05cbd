use crate::payouts::PayoutError;
use crate::store::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// Errors returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Payout(PayoutError),
    Internal(anyhow::Error),
}

impl From<PayoutError> for ApiError {
    fn from(err: PayoutError) -> Self {
        ApiError::Payout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StoreError::NotMember { .. } | StoreError::Invalid(_) => {
                ApiError::BadRequest(err.to_string())
            }
            StoreError::Conflict(_) => ApiError::Conflict(err.to_string()),
            StoreError::Database(e) => ApiError::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Payout(err) => {
                warn!(kind = err.kind(), "payout calculation failed: {}", err);
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "Could not calculate payouts",
                        "kind": err.kind(),
                        "detail": err.to_string(),
                    }),
                )
            }
            ApiError::Internal(err) => {
                error!("Database error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_store_error_mapping() {
        let not_found: ApiError = StoreError::NotFound("space x".to_string()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let not_member: ApiError = StoreError::NotMember {
            player: "Mary".to_string(),
            circle: Uuid::new_v4(),
        }
        .into();
        assert_eq!(not_member.into_response().status(), StatusCode::BAD_REQUEST);

        let conflict: ApiError = StoreError::Conflict("player 'Mary'".to_string()).into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let db: ApiError = StoreError::Database(anyhow::anyhow!("disk full")).into();
        assert_eq!(
            db.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_payout_error_is_bad_request() {
        let err: ApiError = PayoutError::InvalidStake(-1.0).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

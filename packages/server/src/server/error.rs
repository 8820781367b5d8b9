//! HTTP mapping for `AppError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::common::AppError;

/// Failure envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub msg: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AuthenticationRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { success: false, msg })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_bad_request() {
        let response = AppError::validation("Sender not found").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AppError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_auth_is_unauthorized() {
        let response = AppError::AuthenticationRequired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

//! API error taxonomy and its HTTP mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;

/// Every failure a handler can report.
///
/// Client errors carry the message returned to the caller. `Internal` keeps
/// its cause for the server log and never exposes it in the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No token provided")]
    Unauthorized,

    #[error("Invalid token")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    #[error("Incorrect OTP")]
    IncorrectOtp,

    #[error("{0}")]
    OAuthFailed(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Conflict and NotFound keep the 400 the front end expects
            ApiError::BadRequest(_)
            | ApiError::Conflict(_)
            | ApiError::NotFound(_)
            | ApiError::InvalidOrExpiredOtp
            | ApiError::IncorrectOtp => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::OAuthFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            tracing::error!("Request failed: {:#}", cause);
        }

        (
            self.status(),
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ApiError::Conflict("Email already registered".to_string()),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        assert_eq!(ApiError::InvalidOrExpiredOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::IncorrectOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Conflict("taken".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("missing".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_hides_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_duplicate_store_error_is_conflict() {
        let err: ApiError = StoreError::Duplicate("a@x.com".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}

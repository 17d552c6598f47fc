//! API error handling
//!
//! Marketplace errors map onto HTTP statuses by failure class. The body always
//! carries the class, a stable code and the message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use secondop_types::{ErrorKind, MarketError};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Market(err) => err.kind(),
            Self::InvalidParameter(_) | Self::InvalidRequestBody(_) => ErrorKind::Validation,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Market(err) => err.code(),
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::InvalidRequestBody(_) => "invalid_request_body",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        let Self::Market(err) = self else {
            return StatusCode::BAD_REQUEST;
        };
        match err {
            MarketError::Unauthenticated => StatusCode::UNAUTHORIZED,

            MarketError::NotAPatient { .. }
            | MarketError::NotADoctor { .. }
            | MarketError::NotAnAdmin { .. }
            | MarketError::NotApproved { .. }
            | MarketError::NotCaseOwner { .. } => StatusCode::FORBIDDEN,

            MarketError::UserNotFound { .. } | MarketError::CaseNotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            MarketError::CaseNotOpen { .. }
            | MarketError::CaseNotClosed { .. }
            | MarketError::AlreadyRated { .. }
            | MarketError::AdminExists => StatusCode::CONFLICT,

            _ => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Backend => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Precondition => StatusCode::FORBIDDEN,
            },
        }
    }
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub code: String,
    pub msg: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            kind: err.kind(),
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequestBody(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondop_types::Money;

    #[test]
    fn test_status_codes() {
        let cases = [
            (MarketError::InvalidAmount("0".into()), StatusCode::BAD_REQUEST),
            (MarketError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (MarketError::NotADoctor { user_id: "u".into() }, StatusCode::FORBIDDEN),
            (MarketError::CaseNotFound { case_id: "c".into() }, StatusCode::NOT_FOUND),
            (MarketError::AlreadyRated { case_id: "c".into() }, StatusCode::CONFLICT),
            (
                MarketError::InsufficientFunds {
                    user_id: "u".into(),
                    requested: Money::from_cents(4000),
                    available: Money::ZERO,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (MarketError::EmailTaken { email: "a@b.co".into() }, StatusCode::CONFLICT),
            (MarketError::Backend("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
        assert_eq!(
            ApiError::InvalidParameter("id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_body() {
        let body = ErrorResponse::from(&ApiError::from(MarketError::AdminExists));
        assert_eq!(body.kind, ErrorKind::Precondition);
        assert_eq!(body.code, "admin_exists");
    }
}

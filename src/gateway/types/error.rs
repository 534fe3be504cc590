//! Handler error type
//!
//! Every failure leaves the gateway as an `ApiResponse` envelope with a
//! matching HTTP status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::response::{ApiResponse, error_codes};
use crate::ledger::{StoreError, TransferError};
use crate::token::TokenError;
use crate::user::{PasswordError, ValidationError};

/// Handler result: `Json<ApiResponse<T>>` on success
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap `data` in a success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_codes::ALREADY_EXISTS, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    pub fn db_error(msg: impl Into<String>) -> Self {
        Self::internal(msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::not_found("Not found"),
            StoreError::UniqueViolation(msg) | StoreError::ForeignKeyViolation(msg) => {
                ApiError::forbidden(msg)
            }
            other => {
                tracing::error!(error = %other, "Store error");
                ApiError::db_error("Database error")
            }
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        // Transient store failures tell the client to try again
        if matches!(e, TransferError::Persistence(_)) && e.is_retryable() {
            return ApiError::service_unavailable("Ledger busy, retry the request");
        }

        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &e {
            TransferError::AccountNotFound(_) => error_codes::NOT_FOUND,
            TransferError::InvalidTransfer(_) => error_codes::INVALID_TRANSFER,
            TransferError::Persistence(_) => error_codes::INTERNAL_ERROR,
            TransferError::Cancelled => error_codes::TRANSFER_TIMEOUT,
        };
        let msg = match &e {
            // Store details stay in the logs
            TransferError::Persistence(_) => "Transfer failed".to_string(),
            other => other.to_string(),
        };
        ApiError::new(status, code, msg)
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::TOKEN_EXPIRED,
                e.to_string(),
            ),
            TokenError::Invalid => ApiError::unauthorized(e.to_string()),
            other => {
                tracing::error!(error = %other, "Token error");
                ApiError::internal("Token issuance failed")
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Mismatch => ApiError::unauthorized(e.to_string()),
            PasswordError::Hash(msg) => {
                tracing::error!(error = %msg, "Password hashing error");
                ApiError::internal("Password processing failed")
            }
        }
    }
}

//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`; the JSON bodies follow the shapes the checkout
//! popup already understands.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{SubmitError, VerificationError};

/// Application-level error type for the gateway.
#[derive(Debug, Error)]
pub enum AppError {
    /// Verification flow failed.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Order submission failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is worth a Sentry event (server-side failures
    /// only; expected client errors stay out of the error tracker).
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Internal(_) => true,
            Self::Verification(err) => matches!(
                err,
                VerificationError::DeliveryFailed | VerificationError::Store(_)
            ),
            Self::Submit(err) => matches!(err, SubmitError::Store(_)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = match &self {
            Self::Verification(err) => verification_response(err),
            Self::Submit(err) => submit_response(err),
            Self::Database(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn verification_response(err: &VerificationError) -> (StatusCode, serde_json::Value) {
    match err {
        VerificationError::InvalidPhone(_) => {
            (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }))
        }
        VerificationError::MissingCode
        | VerificationError::NoActiveCode
        | VerificationError::CodeExpired
        | VerificationError::TooManyAttempts => (
            StatusCode::BAD_REQUEST,
            json!({ "error": err.to_string(), "verified": false }),
        ),
        VerificationError::WrongCode { attempts_remaining } => (
            StatusCode::BAD_REQUEST,
            json!({
                "error": err.to_string(),
                "verified": false,
                "attemptsRemaining": attempts_remaining,
            }),
        ),
        VerificationError::DeliveryFailed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": err.to_string() }),
        ),
        VerificationError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Internal server error" }),
        ),
    }
}

fn submit_response(err: &SubmitError) -> (StatusCode, serde_json::Value) {
    match err {
        SubmitError::Validation(message) => {
            (StatusCode::BAD_REQUEST, json!({ "error": message }))
        }
        SubmitError::ShopNotAuthorized => (
            StatusCode::NOT_FOUND,
            json!({
                "error": "Shop is not authorized",
                "details": "Reinstall the app to refresh its credentials",
            }),
        ),
        SubmitError::OrderCreation { status, details } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            json!({ "error": "Order creation failed", "details": details }),
        ),
        SubmitError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Internal server error" }),
        ),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_verification_statuses() {
        assert_eq!(
            status_of(AppError::Verification(VerificationError::NoActiveCode)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Verification(VerificationError::WrongCode {
                attempts_remaining: 1
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Verification(VerificationError::DeliveryFailed)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_submit_statuses() {
        assert_eq!(
            status_of(AppError::Submit(SubmitError::Validation("x".to_owned()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Submit(SubmitError::ShopNotAuthorized)),
            StatusCode::NOT_FOUND
        );
        // External status passes through verbatim.
        assert_eq!(
            status_of(AppError::Submit(SubmitError::OrderCreation {
                status: 422,
                details: "Unprocessable".to_owned()
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_internal_status() {
        assert_eq!(
            status_of(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

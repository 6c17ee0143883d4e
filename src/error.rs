//! HTTP boundary errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::{dto::MessageResponse, error::AuthError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A rejection answered with an endpoint-specific message.
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        message: &'static str,
    },
}

impl AppError {
    pub fn bad_request(message: &'static str) -> Self {
        AppError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    /// Status and the message shown to the caller. Internal detail never
    /// leaves this function except through the log.
    pub fn parts(&self) -> (StatusCode, String) {
        let err = match self {
            AppError::Rejected { status, message } => return (*status, (*message).to_string()),
            AppError::Auth(err) => err,
        };
        if err.is_internal() {
            tracing::error!(error = %err, "request failed");
        }
        let (status, message) = match err {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::IncorrectCredential => (StatusCode::UNAUTHORIZED, "Incorrect password."),
            AuthError::InvalidOrExpiredLink => (StatusCode::BAD_REQUEST, "Invalid or expired link."),
            AuthError::LinkExpired => (StatusCode::BAD_REQUEST, "The link has expired."),
            AuthError::EmailMismatch => {
                (StatusCode::BAD_REQUEST, "Email does not match reset request.")
            }
            AuthError::TokenGeneration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token.")
            }
            AuthError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not save your request. Please try again later.",
            ),
            AuthError::Delivery(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not send verification email. Please try again later.",
            ),
            AuthError::Hashing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not process your request. Please try again later.",
            ),
        };
        (status, message.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();
        (status, Json(MessageResponse::error(message))).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::StoreError;
    use std::time::Duration;

    #[test]
    fn caller_errors_keep_their_message() {
        let (status, message) = AppError::from(AuthError::EmailMismatch).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Email does not match reset request.");

        let (status, _) = AppError::from(AuthError::IncorrectCredential).parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = AuthError::Persistence(StoreError::Timeout(Duration::from_secs(5)));
        let (status, message) = AppError::from(err).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("timed out"));
    }

    #[test]
    fn rejected_uses_given_status() {
        let (status, message) = AppError::bad_request("Email is required.").parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Email is required.");
    }
}

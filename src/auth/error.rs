use crate::{auth::store::StoreError, auth::token::TokenError, mailer::NotifyError};

/// Why a verification or reset operation did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("incorrect password")]
    IncorrectCredential,

    #[error("invalid or expired link")]
    InvalidOrExpiredLink,

    #[error("link expired")]
    LinkExpired,

    #[error("email does not match reset request")]
    EmailMismatch,

    #[error("token generation failed: {0}")]
    TokenGeneration(#[from] TokenError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("delivery failure: {0}")]
    Delivery(#[from] NotifyError),

    #[error("credential hashing failed: {0}")]
    Hashing(anyhow::Error),
}

impl AuthError {
    /// Failures of the service itself rather than of the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::TokenGeneration(_)
                | AuthError::Persistence(_)
                | AuthError::Delivery(_)
                | AuthError::Hashing(_)
        )
    }
}

//! Password reset through a single-use, time-limited emailed token.

use std::sync::Arc;

use time::Duration;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        error::AuthError,
        password::hash_password_blocking,
        repo_types::{IssuedToken, TokenKind, User, UserUpdate},
        store::UserStore,
        token::generate_token,
    },
    clock::Clock,
    mailer::{self, Notifier},
};

pub struct PasswordResetService {
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    base_url: String,
    ttl: Duration,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            base_url: base_url.into(),
            ttl,
        }
    }

    /// Issue a reset link. Unknown addresses succeed without any effect.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            info!("reset requested for unknown email");
            return Ok(());
        };

        let issued = IssuedToken {
            token: generate_token()?,
            expires_at: self.clock.now() + self.ttl,
        };
        self.store
            .update_fields(
                user.id,
                UserUpdate {
                    password_reset: Some(Some(issued.clone())),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, expires_at = %issued.expires_at, "password reset issued");

        let mail = mailer::reset_mail(&self.base_url, &issued.token, self.ttl.whole_minutes());
        mailer::send_best_effort(self.notifier.as_ref(), &user.email, &mail).await;
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .find_by_token(TokenKind::PasswordReset, token)
            .await?
            .ok_or(AuthError::InvalidOrExpiredLink)?;
        let now = self.clock.now();
        match user.issued(TokenKind::PasswordReset) {
            Some(issued) if !issued.is_expired(now) => Ok(user),
            _ => {
                warn!(user_id = %user.id, "reset link expired");
                Err(AuthError::InvalidOrExpiredLink)
            }
        }
    }

    /// Check a reset link without consuming it; hands the token back so the
    /// caller can prefill the form.
    #[instrument(skip_all)]
    pub async fn reset_form(&self, token: &str) -> Result<String, AuthError> {
        let user = self.resolve(token).await?;
        Ok(user.password_reset_token.unwrap_or_default())
    }

    #[instrument(skip(self, token, new_password))]
    pub async fn confirm_reset(
        &self,
        token: &str,
        email: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.resolve(token).await?;
        if user.email != email {
            warn!(user_id = %user.id, "reset attempted with mismatched email");
            return Err(AuthError::EmailMismatch);
        }

        let password_hash = hash_password_blocking(new_password)
            .await
            .map_err(AuthError::Hashing)?;
        self.store
            .update_fields(
                user.id,
                UserUpdate {
                    password_hash: Some(password_hash),
                    password_reset: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, "password reset completed");

        mailer::send_best_effort(self.notifier.as_ref(), &user.email, &mailer::reset_done_mail())
            .await;
        Ok(())
    }
}

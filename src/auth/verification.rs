//! Email verification: unregistered → pending → verified.

use std::sync::Arc;

use serde::Serialize;
use time::Duration;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        error::AuthError,
        password::{hash_password_blocking, verify_password_blocking},
        repo_types::{IssuedToken, NewUser, TokenKind, User, UserUpdate},
        store::{StoreError, UserStore},
        token::generate_token,
    },
    clock::Clock,
    mailer::{self, Notifier},
};

/// Result of a verification request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    VerificationSent,
    AlreadyVerified,
}

/// Result of following a verification link that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    VerifiedSuccessfully,
    AlreadyVerified,
}

/// Read-only projection for `/check-verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerificationStatus {
    pub verified: bool,
    pub expired: bool,
}

pub struct VerificationService {
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    base_url: String,
    ttl: Duration,
}

impl VerificationService {
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

    fn issue(&self) -> Result<IssuedToken, AuthError> {
        Ok(IssuedToken {
            token: generate_token()?,
            expires_at: self.clock.now() + self.ttl,
        })
    }

    async fn send_link(&self, email: &str, token: &str) -> Result<(), AuthError> {
        let mail = mailer::verification_mail(&self.base_url, token);
        self.notifier
            .send(email, &mail.subject, &mail.body)
            .await
            .map_err(|e| {
                warn!(error = %e, %email, "verification mail not delivered");
                AuthError::Delivery(e)
            })
    }

    /// Overwrite any outstanding token with a fresh one. Does not touch
    /// `verified`, so a confirmation racing with this write is never undone.
    async fn reissue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let issued = self.issue()?;
        self.store
            .update_fields(
                user.id,
                UserUpdate {
                    verification: Some(Some(issued.clone())),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, expires_at = %issued.expires_at, "verification token reissued");
        Ok(issued)
    }

    #[instrument(skip(self, password))]
    pub async fn request_verification(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RequestOutcome, AuthError> {
        match self.store.find_by_email(email).await? {
            Some(user) => self.request_for_existing(user, password).await,
            None => self.register(email, password).await,
        }
    }

    async fn register(&self, email: &str, password: &str) -> Result<RequestOutcome, AuthError> {
        let password_hash = hash_password_blocking(password)
            .await
            .map_err(AuthError::Hashing)?;
        let issued = self.issue()?;
        let inserted = self
            .store
            .insert(NewUser {
                email: email.to_string(),
                password_hash,
                verification: issued.clone(),
            })
            .await;

        let user = match inserted {
            Ok(user) => user,
            // A concurrent request registered the same email first.
            Err(StoreError::Duplicate(_)) => {
                let Some(user) = self.store.find_by_email(email).await? else {
                    return Err(StoreError::Duplicate(email.to_string()).into());
                };
                info!(user_id = %user.id, "registration lost insert race, continuing as existing user");
                return self.request_for_existing(user, password).await;
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, expires_at = %issued.expires_at, "user registered, pending verification");
        self.send_link(&user.email, &issued.token).await?;
        Ok(RequestOutcome::VerificationSent)
    }

    async fn request_for_existing(
        &self,
        user: User,
        password: &str,
    ) -> Result<RequestOutcome, AuthError> {
        let matches = verify_password_blocking(password, &user.password_hash)
            .await
            .map_err(AuthError::Hashing)?;
        if !matches {
            warn!(user_id = %user.id, "verification request with incorrect password");
            return Err(AuthError::IncorrectCredential);
        }

        if user.verified {
            let mail = mailer::already_verified_mail();
            mailer::send_best_effort(self.notifier.as_ref(), &user.email, &mail).await;
            return Ok(RequestOutcome::AlreadyVerified);
        }

        let issued = self.reissue(&user).await?;
        self.send_link(&user.email, &issued.token).await?;
        Ok(RequestOutcome::VerificationSent)
    }

    #[instrument(skip_all)]
    pub async fn confirm_verification(&self, token: &str) -> Result<ConfirmOutcome, AuthError> {
        let Some(user) = self
            .store
            .find_by_token(TokenKind::Verification, token)
            .await?
        else {
            warn!("verification link matches no user");
            return Err(AuthError::InvalidOrExpiredLink);
        };

        if user.verified {
            return Ok(ConfirmOutcome::AlreadyVerified);
        }

        let now = self.clock.now();
        let live = user
            .issued(TokenKind::Verification)
            .is_some_and(|t| !t.is_expired(now));
        if !live {
            warn!(user_id = %user.id, "verification link expired");
            return Err(AuthError::LinkExpired);
        }

        // The token is kept after success so a repeated click reports
        // AlreadyVerified instead of an invalid link.
        self.store
            .update_fields(
                user.id,
                UserUpdate {
                    verified: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, "email verified");
        Ok(ConfirmOutcome::VerifiedSuccessfully)
    }

    /// `None` when no user has this email.
    #[instrument(skip(self))]
    pub async fn check_verified(
        &self,
        email: &str,
    ) -> Result<Option<VerificationStatus>, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(None);
        };
        let expired = !user.verified
            && user
                .verification_expiry
                .is_some_and(|expiry| self.clock.now() >= expiry);
        Ok(Some(VerificationStatus {
            verified: user.verified,
            expired,
        }))
    }

    /// Re-arm verification without a password. Unknown and already verified
    /// addresses succeed silently so the response reveals nothing.
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            info!("resend requested for unknown email");
            return Ok(());
        };
        if user.verified {
            info!(user_id = %user.id, "resend requested for verified user");
            return Ok(());
        }

        let issued = self.reissue(&user).await?;
        let mail = mailer::verification_mail(&self.base_url, &issued.token);
        mailer::send_best_effort(self.notifier.as_ref(), &user.email, &mail).await;
        Ok(())
    }
}

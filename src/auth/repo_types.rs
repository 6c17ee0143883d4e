use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    pub verification_expiry: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    pub password_reset_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// The outstanding token and expiry of the given kind, if both are set.
    pub fn issued(&self, kind: TokenKind) -> Option<IssuedToken> {
        let (token, expires_at) = match kind {
            TokenKind::Verification => (&self.verification_token, self.verification_expiry),
            TokenKind::PasswordReset => (&self.password_reset_token, self.password_reset_expiry),
        };
        match (token, expires_at) {
            (Some(token), Some(expires_at)) if !token.is_empty() => Some(IssuedToken {
                token: token.clone(),
                expires_at,
            }),
            _ => None,
        }
    }
}

/// Which token column a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Verification,
    PasswordReset,
}

impl TokenKind {
    pub(crate) fn column(self) -> &'static str {
        match self {
            TokenKind::Verification => "verification_token",
            TokenKind::PasswordReset => "password_reset_token",
        }
    }
}

/// A token together with the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl IssuedToken {
    /// Valid only while `now < expires_at`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Fields for a freshly registered, unverified user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub verification: IssuedToken,
}

/// A partial update applied atomically by the store.
///
/// `None` leaves a field untouched. For the token pairs, `Some(None)` unsets
/// both token and expiry, `Some(Some(_))` replaces both.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub verified: Option<bool>,
    pub verification: Option<Option<IssuedToken>>,
    pub password_reset: Option<Option<IssuedToken>>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.verified.is_none()
            && self.verification.is_none()
            && self.password_reset.is_none()
    }

    /// Apply the update to an in-memory record.
    pub fn apply(self, user: &mut User) {
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(verified) = self.verified {
            user.verified = verified;
        }
        if let Some(verification) = self.verification {
            let (token, expiry) = split(verification);
            user.verification_token = token;
            user.verification_expiry = expiry;
        }
        if let Some(reset) = self.password_reset {
            let (token, expiry) = split(reset);
            user.password_reset_token = token;
            user.password_reset_expiry = expiry;
        }
    }
}

pub(crate) fn split(issued: Option<IssuedToken>) -> (Option<String>, Option<OffsetDateTime>) {
    match issued {
        Some(IssuedToken { token, expires_at }) => (Some(token), Some(expires_at)),
        None => (None, None),
    }
}

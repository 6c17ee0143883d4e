//! Storage capability used by the verification and reset flows.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, TokenKind, User, UserUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("email already registered: {0}")]
    Duplicate(String),

    #[error("user not found: {0}")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Resolve a user by an outstanding token. An empty token never matches.
    async fn find_by_token(&self, kind: TokenKind, token: &str)
        -> Result<Option<User>, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Set every field present in `update` in a single atomic write.
    async fn update_fields(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError>;
}

/// Bounds every call on the inner store by a fixed timeout.
///
/// The inner future is dropped on timeout; a write that already reached the
/// database may still have been applied.
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(res) => res,
            Err(_) => {
                warn!(op, limit_ms = self.limit.as_millis() as u64, "store call timed out");
                Err(StoreError::Timeout(self.limit))
            }
        }
    }
}

#[async_trait]
impl<S: UserStore> UserStore for TimeoutStore<S> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.bounded("find_by_email", self.inner.find_by_email(email))
            .await
    }

    async fn find_by_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        self.bounded("find_by_token", self.inner.find_by_token(kind, token))
            .await
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.bounded("insert", self.inner.insert(user)).await
    }

    async fn update_fields(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        self.bounded("update_fields", self.inner.update_fields(id, update))
            .await
    }
}

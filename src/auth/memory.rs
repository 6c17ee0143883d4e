//! In-memory `UserStore`: the reference implementation of the store contract
//! and the fake the service and HTTP tests run against.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo_types::{split, NewUser, TokenKind, User, UserUpdate},
    store::{StoreError, UserStore},
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        let users = self.users.read().await;
        let found = users.values().find(|u| {
            let stored = match kind {
                TokenKind::Verification => u.verification_token.as_deref(),
                TokenKind::PasswordReset => u.password_reset_token.as_deref(),
            };
            stored == Some(token)
        });
        Ok(found.cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate(new.email));
        }
        let (verification_token, verification_expiry) = split(Some(new.verification));
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            verified: false,
            verification_token,
            verification_expiry,
            password_reset_token: None,
            password_reset_expiry: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_fields(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        update.apply(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::IssuedToken;
    use time::Duration;

    fn new_user(email: &str, token: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            verification: IssuedToken {
                token: token.into(),
                expires_at: OffsetDateTime::now_utc() + Duration::minutes(3),
            },
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@x.com", "t1")).await.unwrap();
        let err = store.insert(new_user("a@x.com", "t2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(email) if email == "a@x.com"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn email_lookup_is_exact() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@x.com", "t1")).await.unwrap();
        assert!(store.find_by_email("A@x.com").await.unwrap().is_none());
        assert!(store.find_by_email("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn token_lookup_by_kind_and_never_empty() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@x.com", "t1")).await.unwrap();

        let hit = store
            .find_by_token(TokenKind::Verification, "t1")
            .await
            .unwrap();
        assert_eq!(hit.map(|u| u.id), Some(user.id));

        assert!(store
            .find_by_token(TokenKind::PasswordReset, "t1")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_token(TokenKind::PasswordReset, "")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_sets_and_unsets_token_pairs() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@x.com", "t1")).await.unwrap();
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(15);

        store
            .update_fields(
                user.id,
                UserUpdate {
                    password_reset: Some(Some(IssuedToken {
                        token: "r1".into(),
                        expires_at,
                    })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.password_reset_token.as_deref(), Some("r1"));
        assert_eq!(stored.password_reset_expiry, Some(expires_at));
        assert_eq!(stored.verification_token.as_deref(), Some("t1"));

        store
            .update_fields(
                user.id,
                UserUpdate {
                    password_hash: Some("new-hash".into()),
                    password_reset: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.password_reset_token.is_none());
        assert!(stored.password_reset_expiry.is_none());
    }

    #[tokio::test]
    async fn update_unknown_user_is_not_found() {
        let store = MemoryUserStore::new();
        let id = Uuid::new_v4();
        let err = store
            .update_fields(id, UserUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }
}

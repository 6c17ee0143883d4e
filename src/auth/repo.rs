use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::{
    repo_types::{split, NewUser, TokenKind, User, UserUpdate},
    store::{StoreError, UserStore},
};

const USER_COLUMNS: &str = "id, email, password_hash, verified, \
     verification_token, verification_expiry, \
     password_reset_token, password_reset_expiry, created_at";

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(err: sqlx::Error, email: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(email.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Find a user by email (exact match).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = $1",
            kind.column()
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    /// Create a new unverified user with an outstanding verification token.
    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let email = new.email.clone();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, verified, verification_token, verification_expiry)
            VALUES ($1, $2, $3, FALSE, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.verification.token)
        .bind(new.verification.expires_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_insert_error(e, &email))?;
        Ok(user)
    }

    async fn update_fields(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        if let Some(hash) = update.password_hash {
            set.push("password_hash = ");
            set.push_bind_unseparated(hash);
        }
        if let Some(verified) = update.verified {
            set.push("verified = ");
            set.push_bind_unseparated(verified);
        }
        if let Some(verification) = update.verification {
            let (token, expiry) = split(verification);
            set.push("verification_token = ");
            set.push_bind_unseparated(token);
            set.push("verification_expiry = ");
            set.push_bind_unseparated(expiry);
        }
        if let Some(reset) = update.password_reset {
            let (token, expiry) = split(reset);
            set.push("password_reset_token = ");
            set.push_bind_unseparated(token);
            set.push("password_reset_expiry = ");
            set.push_bind_unseparated(expiry);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let done = qb.build().execute(&self.db).await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

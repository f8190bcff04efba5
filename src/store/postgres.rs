use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, TokenStore, UserStore};
use crate::auth::repo_types::{AuthToken, NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, nickname, city, avatar_url, bio, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, user_id, token_hash, revoked, created_at, last_used_at";

/// Postgres-backed store. The conference and registration impls live next to
/// their types in `conferences::repo` and `registrations::repo`.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps unique violations to `Duplicate`, everything else to a backend error.
pub(crate) fn classify(e: sqlx::Error, what: &'static str, op: &'static str) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(what);
        }
    }
    StoreError::Backend(anyhow::Error::new(e).context(op))
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, name, nickname, city, avatar_url, bio)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.nickname)
            .bind(&user.city)
            .bind(&user.avatar_url)
            .bind(&user.bio)
            .fetch_one(&self.db)
            .await
            .map_err(|e| classify(e, "email", "insert user"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("select user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("select user by id")?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users SET
                name       = COALESCE($2, name),
                nickname   = COALESCE($3, nickname),
                city       = COALESCE($4, city),
                avatar_url = COALESCE($5, avatar_url),
                bio        = COALESCE($6, bio),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.nickname)
            .bind(update.city)
            .bind(update.avatar_url)
            .bind(update.bio)
            .fetch_optional(&self.db)
            .await
            .context("update user profile")?;
        Ok(user)
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert(&self, user_id: Uuid, token_hash: &str) -> Result<AuthToken, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO auth_tokens (user_id, token_hash)
            VALUES ($1, $2)
            RETURNING {TOKEN_COLUMNS}
            "#
        );
        sqlx::query_as::<_, AuthToken>(&sql)
            .bind(user_id)
            .bind(token_hash)
            .fetch_one(&self.db)
            .await
            .map_err(|e| classify(e, "token", "insert auth token"))
    }

    async fn find_by_digest(&self, token_hash: &str) -> Result<Option<AuthToken>, StoreError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE token_hash = $1");
        let token = sqlx::query_as::<_, AuthToken>(&sql)
            .bind(token_hash)
            .fetch_optional(&self.db)
            .await
            .context("select auth token by digest")?;
        Ok(token)
    }

    async fn revoke(
        &self,
        user_id: Uuid,
        token_id: Uuid,
    ) -> Result<Option<AuthToken>, StoreError> {
        let sql = format!(
            r#"
            UPDATE auth_tokens SET revoked = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {TOKEN_COLUMNS}
            "#
        );
        let token = sqlx::query_as::<_, AuthToken>(&sql)
            .bind(token_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("revoke auth token")?;
        Ok(token)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AuthToken>, StoreError> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let tokens = sqlx::query_as::<_, AuthToken>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .context("list auth tokens")?;
        Ok(tokens)
    }

    async fn touch(&self, token_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE auth_tokens SET last_used_at = NOW() WHERE id = $1")
            .bind(token_id)
            .execute(&self.db)
            .await
            .context("touch auth token")?;
        Ok(())
    }
}

use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    password::{spawn_hash, spawn_verify},
    repo_types::{AuthToken, NewUser, ProfileUpdate, User},
    token,
};
use crate::{
    error::ApiError,
    state::AppState,
    store::{StoreError, TokenStore, UserStore},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A user together with the raw secret of a freshly issued token.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub secret: String,
}

/// Registration, login and token bookkeeping over the injected stores.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    min_password_len: usize,
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.tokens.clone(),
            state.config.min_password_len,
        )
    }
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        min_password_len: usize,
    ) -> Self {
        Self {
            users,
            tokens,
            min_password_len,
        }
    }

    async fn issue_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let issued = token::generate()?;
        self.tokens.insert(user_id, &issued.digest).await?;
        Ok(issued.secret)
    }

    pub async fn register(&self, mut new_user: NewUser, password: &str) -> Result<Session, ApiError> {
        new_user.email = normalize_email(&new_user.email);
        if !is_valid_email(&new_user.email) {
            warn!(email = %new_user.email, "invalid email");
            return Err(ApiError::Validation("Invalid email".into()));
        }
        if password.chars().count() < self.min_password_len {
            return Err(ApiError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }

        // Fast path only; the unique constraint below is what actually decides.
        if self.users.find_by_email(&new_user.email).await?.is_some() {
            warn!(email = %new_user.email, "email already registered");
            return Err(ApiError::Conflict("Email already registered".into()));
        }

        new_user.password_hash = spawn_hash(password.to_owned()).await?;
        let user = match self.users.create(new_user).await {
            Ok(u) => u,
            Err(StoreError::Duplicate(_)) => {
                warn!("email registered concurrently");
                return Err(ApiError::Conflict("Email already registered".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let secret = self.issue_token(user.id).await?;
        info!(user_id = %user.id, "user registered");
        Ok(Session { user, secret })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let email = normalize_email(email);
        let invalid = || ApiError::Unauthorized("Invalid credentials".into());

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(invalid());
        };
        if !spawn_verify(password.to_owned(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(invalid());
        }

        let secret = self.issue_token(user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(Session { user, secret })
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, ApiError> {
        if matches!(update.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(ApiError::Validation("Name must not be empty".into()));
        }
        self.users
            .update_profile(user_id, update)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    pub async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<AuthToken>, ApiError> {
        Ok(self.tokens.list_by_user(user_id).await?)
    }

    /// Idempotent: revoking twice returns the same revoked record.
    pub async fn revoke(&self, user_id: Uuid, token_id: Uuid) -> Result<AuthToken, ApiError> {
        let token = self
            .tokens
            .revoke(user_id, token_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Token not found".into()))?;
        info!(user_id = %user_id, token_id = %token_id, "token revoked");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;

    fn service() -> AccountService {
        let store = Arc::new(MemoryStore::new());
        AccountService::new(store.clone(), store, 8)
    }

    fn new_user(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: String::new(),
            name: name.into(),
            nickname: None,
            city: None,
            avatar_url: None,
            bio: None,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("not an email"));
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let svc = service();
        let reg = svc.register(new_user("a@b.com", "A"), "secret123").await.unwrap();
        assert!(!reg.secret.is_empty());
        assert_ne!(reg.user.password_hash, "secret123");

        let login = svc.login("a@b.com", "secret123").await.unwrap();
        assert_eq!(login.user.id, reg.user.id);
        assert_ne!(login.secret, reg.secret);

        let err = svc.login("a@b.com", "wrong-password").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_does_not_reveal_unknown_accounts() {
        let svc = service();
        svc.register(new_user("a@b.com", "A"), "secret123").await.unwrap();
        let unknown = svc.login("nobody@b.com", "secret123").await.unwrap_err();
        let wrong = svc.login("a@b.com", "secret124").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status_code(), wrong.status_code());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let svc = service();
        svc.register(new_user("a@b.com", "A"), "secret123").await.unwrap();
        let err = svc
            .register(new_user(" A@b.com", "B"), "secret123")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let err = service()
            .register(new_user("a@b.com", "A"), "short")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_owner_scoped() {
        let svc = service();
        let reg = svc.register(new_user("a@b.com", "A"), "secret123").await.unwrap();
        let other = svc.register(new_user("c@d.com", "C"), "secret123").await.unwrap();
        let token_id = svc.list_tokens(reg.user.id).await.unwrap()[0].id;

        let first = svc.revoke(reg.user.id, token_id).await.unwrap();
        let second = svc.revoke(reg.user.id, token_id).await.unwrap();
        assert!(first.revoked && second.revoked);
        assert_eq!(first.id, second.id);

        let err = svc.revoke(other.user.id, token_id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let err = svc.revoke(reg.user.id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_keeps_earlier_tokens_valid() {
        let svc = service();
        let reg = svc.register(new_user("a@b.com", "A"), "secret123").await.unwrap();
        svc.login("a@b.com", "secret123").await.unwrap();
        let tokens = svc.list_tokens(reg.user.id).await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| !t.revoked));
    }

    #[tokio::test]
    async fn empty_name_update_is_rejected() {
        let svc = service();
        let reg = svc.register(new_user("a@b.com", "A"), "secret123").await.unwrap();
        let err = svc
            .update_profile(
                reg.user.id,
                ProfileUpdate {
                    name: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}

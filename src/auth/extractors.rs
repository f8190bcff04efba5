use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, field, warn, Span};
use uuid::Uuid;

use super::token;
use crate::{error::ApiError, state::AppState, store::TokenStore};

/// Resolves bearer secrets to user ids against the token store.
#[derive(Clone)]
pub struct TokenGate {
    tokens: Arc<dyn TokenStore>,
}

impl FromRef<AppState> for TokenGate {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.tokens.clone())
    }
}

/// Pulls the secret out of `Bearer <secret>`; the scheme is case-insensitive.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, ApiError> {
    let header = header.ok_or_else(|| {
        ApiError::Unauthorized("Authorization header required".into())
    })?;

    let invalid = || ApiError::Unauthorized("Invalid authorization header format".into());
    let (scheme, secret) = header.split_once(' ').ok_or_else(invalid)?;
    if !scheme.eq_ignore_ascii_case("bearer") || secret.is_empty() {
        return Err(invalid());
    }
    Ok(secret)
}

impl TokenGate {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }

    /// Extract, digest, resolve, check revocation. Returns the owning user.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Uuid, ApiError> {
        let secret = parse_bearer(header)?;
        let digest = token::digest(secret);

        let token = self
            .tokens
            .find_by_digest(&digest)
            .await?
            .ok_or_else(|| {
                debug!("unknown bearer token");
                ApiError::Unauthorized("Invalid token".into())
            })?;

        if token.revoked {
            debug!(token_id = %token.id, "revoked bearer token");
            return Err(ApiError::Unauthorized("Token revoked".into()));
        }

        if let Err(e) = self.tokens.touch(token.id).await {
            warn!(error = %e, token_id = %token.id, "failed to record token use");
        }

        Ok(token.user_id)
    }
}

/// Identity admitted by the gate. Handlers take it as a parameter and never
/// read a user id from the request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenGate: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(v) => Some(v.to_str().map_err(|_| {
                ApiError::Unauthorized("Invalid authorization header format".into())
            })?),
            None => None,
        };
        let gate = TokenGate::from_ref(state);
        let user_id = gate.authenticate(header).await?;
        // fills the `user_id` slot of the per-request span
        Span::current().record("user_id", field::display(user_id));
        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use crate::auth::repo_types::AuthToken;
    use axum::http::StatusCode;

    #[test]
    fn parse_bearer_accepts_any_scheme_case() {
        assert_eq!(parse_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(parse_bearer(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(parse_bearer(Some("BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn parse_bearer_rejects_bad_headers() {
        for header in [None, Some(""), Some("Basic xyz"), Some("Bearer"), Some("Bearer ")] {
            let err = parse_bearer(header).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{header:?}");
        }
        assert_eq!(
            parse_bearer(None).unwrap_err().to_string(),
            "Authorization header required"
        );
    }

    #[tokio::test]
    async fn valid_token_resolves_to_owner() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        let issued = token::generate().unwrap();
        store.insert(user_id, &issued.digest).await.unwrap();

        let gate = TokenGate::new(store.clone());
        let header = format!("Bearer {}", issued.secret);
        assert_eq!(gate.authenticate(Some(&header)).await.unwrap(), user_id);

        let listed = store.list_by_user(user_id).await.unwrap();
        assert!(listed[0].last_used_at.is_some());
    }

    #[tokio::test]
    async fn unknown_and_revoked_tokens_are_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        let issued = token::generate().unwrap();
        let record = store.insert(user_id, &issued.digest).await.unwrap();
        let gate = TokenGate::new(store.clone());

        let unknown = format!("Bearer {}", token::generate().unwrap().secret);
        let err = gate.authenticate(Some(&unknown)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        store.revoke(user_id, record.id).await.unwrap();
        let header = format!("Bearer {}", issued.secret);
        let err = gate.authenticate(Some(&header)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn digest_is_what_gets_looked_up() {
        let store = Arc::new(MemoryStore::new());
        let issued = token::generate().unwrap();
        store.insert(Uuid::new_v4(), &issued.digest).await.unwrap();
        let gate = TokenGate::new(store);

        // Presenting the stored digest itself must not authenticate.
        let header = format!("Bearer {}", issued.digest);
        assert!(gate.authenticate(Some(&header)).await.is_err());
    }

    struct BrokenStore;

    #[async_trait]
    impl TokenStore for BrokenStore {
        async fn insert(&self, _u: Uuid, _h: &str) -> Result<AuthToken, StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
        async fn find_by_digest(&self, _h: &str) -> Result<Option<AuthToken>, StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
        async fn revoke(&self, _u: Uuid, _t: Uuid) -> Result<Option<AuthToken>, StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
        async fn list_by_user(&self, _u: Uuid) -> Result<Vec<AuthToken>, StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
        async fn touch(&self, _t: Uuid) -> Result<(), StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
    }

    #[tokio::test]
    async fn storage_failure_is_internal_not_unauthorized() {
        let gate = TokenGate::new(Arc::new(BrokenStore));
        let err = gate.authenticate(Some("Bearer abc")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }
}

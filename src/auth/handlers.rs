use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, RegisterRequest, RevokeRequest, TokenSummary,
            UpdateProfileRequest,
        },
        extractors::AuthUser,
        repo_types::{NewUser, User},
        services::AccountService,
    },
    error::{json_body, ApiError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me))
}

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", get(list_tokens))
        .route("/tokens/revoke", post(revoke_token))
}

#[instrument(skip(accounts, payload))]
pub async fn register(
    State(accounts): State<AccountService>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let req = json_body(payload)?;
    if req.email.trim().is_empty() || req.password.is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::Validation(
            "Email, password and name are required".into(),
        ));
    }

    let new_user = NewUser {
        email: req.email,
        password_hash: String::new(),
        name: req.name.trim().to_string(),
        nickname: req.nickname,
        city: req.city,
        avatar_url: req.avatar_url,
        bio: req.bio,
    };
    let session = accounts.register(new_user, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: session.user,
            token: session.secret,
        }),
    ))
}

#[instrument(skip(accounts, payload))]
pub async fn login(
    State(accounts): State<AccountService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = json_body(payload)?;
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".into()));
    }

    let session = accounts.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse {
        user: session.user,
        token: session.secret,
    }))
}

#[instrument(skip(accounts))]
pub async fn get_me(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(accounts.current_user(user_id).await?))
}

#[instrument(skip(accounts, payload))]
pub async fn update_me(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let req = json_body(payload)?;
    Ok(Json(accounts.update_profile(user_id, req.into()).await?))
}

#[instrument(skip(accounts))]
pub async fn list_tokens(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TokenSummary>>, ApiError> {
    let tokens = accounts.list_tokens(user_id).await?;
    Ok(Json(tokens.into_iter().map(TokenSummary::from).collect()))
}

#[instrument(skip(accounts, payload))]
pub async fn revoke_token(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<TokenSummary>, ApiError> {
    let req = json_body(payload)?;
    if req.id.is_empty() {
        return Err(ApiError::Validation("Token ID required".into()));
    }
    let token_id = Uuid::parse_str(req.id.trim())
        .map_err(|_| ApiError::Validation("Invalid token ID".into()))?;

    let token = accounts.revoke(user_id, token_id).await?;
    Ok(Json(token.into()))
}

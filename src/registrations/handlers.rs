use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{RegisterToConferenceRequest, RegistrationSummary},
    repo_types::Registration,
};
use crate::{
    auth::AuthUser,
    conferences::handlers::{load_conference, parse_id},
    error::{json_body, ApiError},
    state::AppState,
    store::StoreError,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conferences/:id/register", post(register_to_conference))
        .route("/users/registrations", get(my_registrations))
        .route("/users/registrations/:conference_id", delete(cancel_registration))
}

#[instrument(skip(state, payload))]
pub async fn register_to_conference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<RegisterToConferenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let conference_id = parse_id(&id, "conference")?;
    let req = json_body(payload)?;
    load_conference(&state, conference_id).await?;

    let new = req.into_new(user_id, conference_id);
    let registration = match state.registrations.register(new).await {
        Ok(r) => r,
        Err(StoreError::Duplicate(_)) => {
            return Err(ApiError::Conflict(
                "Already registered to this conference".into(),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    info!(%user_id, %conference_id, role = %registration.role, "registered to conference");
    Ok((StatusCode::CREATED, Json(registration)))
}

#[instrument(skip(state))]
pub async fn my_registrations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RegistrationSummary>>, ApiError> {
    let rows = state.registrations.list_registrations(user_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn cancel_registration(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(conference_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conference_id = parse_id(&conference_id, "conference")?;
    if !state.registrations.cancel(user_id, conference_id).await? {
        return Err(ApiError::NotFound("Registration not found".into()));
    }
    info!(%user_id, %conference_id, "registration cancelled");
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ConferenceDetails, ConferenceFilter, CreateConferenceRequest, RidesResponse},
    repo_types::{Conference, RideFilter},
};
use crate::{
    auth::AuthUser,
    error::{json_body, query_params, ApiError},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/conferences", get(list_conferences))
        .route("/conferences/:id", get(get_conference))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/conferences", post(create_conference))
        .route("/conferences/:id", delete(delete_conference))
        .route("/conferences/:id/rides", get(list_rides))
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Validation(format!("Invalid {what} ID")))
}

pub(crate) async fn load_conference(state: &AppState, id: Uuid) -> Result<Conference, ApiError> {
    state
        .conferences
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conference not found".into()))
}

#[instrument(skip(state))]
pub async fn list_conferences(
    State(state): State<AppState>,
    filter: Result<Query<ConferenceFilter>, QueryRejection>,
) -> Result<Json<Vec<Conference>>, ApiError> {
    let filter = query_params(filter)?;
    let location = filter
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());
    let rows = state.conferences.list(location, filter.upcoming).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_conference(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConferenceDetails>, ApiError> {
    let id = parse_id(&id, "conference")?;
    let conference = load_conference(&state, id).await?;
    let attendees = state.conferences.attendees(id).await?;
    Ok(Json(ConferenceDetails {
        conference,
        attendees: attendees.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_conference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateConferenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Conference>), ApiError> {
    let new = json_body(payload)?.validate(user_id)?;
    let conference = state.conferences.create_conference(new).await?;
    info!(conference_id = %conference.id, %user_id, "conference created");
    Ok((StatusCode::CREATED, Json(conference)))
}

#[instrument(skip(state))]
pub async fn delete_conference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "conference")?;
    if !state.conferences.delete_owned(id, user_id).await? {
        return Err(ApiError::NotFound("Conference not found".into()));
    }
    info!(conference_id = %id, %user_id, "conference deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_rides(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RidesResponse>, ApiError> {
    let id = parse_id(&id, "conference")?;
    load_conference(&state, id).await?;
    let needing = state.conferences.riders(id, RideFilter::Needing).await?;
    let offering = state.conferences.riders(id, RideFilter::Offering).await?;
    Ok(Json(RidesResponse {
        needing_ride: needing.into_iter().map(Into::into).collect(),
        offering_ride: offering.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_reports_bad_ids_as_validation() {
        assert!(parse_id("6f1c1a7e-0000-4000-8000-000000000001", "conference").is_ok());
        let err = parse_id("42", "conference").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid conference ID");
    }
}

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewConference {
    pub title: String,
    pub date: OffsetDateTime,
    pub location: String,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_by: Uuid,
}

/// Registration joined with the public part of the registered user.
#[derive(Debug, Clone, FromRow)]
pub struct AttendeeRow {
    pub user_id: Uuid,
    pub name: String,
    pub nickname: Option<String>,
    pub city: Option<String>,
    pub avatar_url: Option<String>,
    pub role: String,
    pub notes: Option<String>,
    pub needs_ride: bool,
    pub has_car: bool,
}

/// Ride lists of a conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideFilter {
    Needing,
    Offering,
}

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{AttendeeRow, Conference, NewConference};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ConferenceFilter {
    pub location: Option<String>,
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateConferenceRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CreateConferenceRequest {
    pub fn validate(self, created_by: Uuid) -> Result<NewConference, ApiError> {
        let title = self.title.trim().to_string();
        let location = self.location.trim().to_string();
        if title.is_empty() || location.is_empty() || self.date.trim().is_empty() {
            return Err(ApiError::Validation(
                "Title, location and date are required".into(),
            ));
        }
        let date = OffsetDateTime::parse(self.date.trim(), &Rfc3339)
            .map_err(|_| ApiError::Validation("Invalid date format".into()))?;
        if matches!(self.latitude, Some(lat) if !(-90.0..=90.0).contains(&lat)) {
            return Err(ApiError::Validation("Latitude out of range".into()));
        }
        if matches!(self.longitude, Some(lon) if !(-180.0..=180.0).contains(&lon)) {
            return Err(ApiError::Validation("Longitude out of range".into()));
        }
        Ok(NewConference {
            title,
            date,
            location,
            website: self.website.filter(|w| !w.trim().is_empty()),
            latitude: self.latitude,
            longitude: self.longitude,
            created_by,
        })
    }
}

/// Public fields of a registered user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub user: PublicProfile,
    pub role: String,
    pub needs_ride: bool,
    pub has_car: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    pub user: PublicProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AttendeeRow {
    fn profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.user_id,
            name: self.name.clone(),
            nickname: self.nickname.clone(),
            city: self.city.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

impl From<AttendeeRow> for Attendee {
    fn from(r: AttendeeRow) -> Self {
        Self {
            user: r.profile(),
            role: r.role,
            needs_ride: r.needs_ride,
            has_car: r.has_car,
        }
    }
}

impl From<AttendeeRow> for Rider {
    fn from(r: AttendeeRow) -> Self {
        Self {
            user: r.profile(),
            notes: r.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConferenceDetails {
    #[serde(flatten)]
    pub conference: Conference,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RidesResponse {
    pub needing_ride: Vec<Rider>,
    pub offering_ride: Vec<Rider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(date: &str) -> CreateConferenceRequest {
        CreateConferenceRequest {
            title: "RustLab".into(),
            date: date.into(),
            location: "Firenze".into(),
            website: Some("".into()),
            latitude: Some(43.77),
            longitude: Some(11.25),
        }
    }

    #[test]
    fn valid_request_becomes_new_conference() {
        let owner = Uuid::new_v4();
        let c = request("2026-11-09T09:00:00Z").validate(owner).unwrap();
        assert_eq!(c.title, "RustLab");
        assert_eq!(c.created_by, owner);
        assert_eq!(c.date.year(), 2026);
        assert!(c.website.is_none());
    }

    #[test]
    fn bad_dates_and_missing_fields_are_validation_errors() {
        let err = request("next tuesday").validate(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format");

        let mut req = request("2026-11-09T09:00:00Z");
        req.title = "  ".into();
        assert!(matches!(
            req.validate(Uuid::new_v4()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn coordinates_are_range_checked() {
        let mut req = request("2026-11-09T09:00:00Z");
        req.latitude = Some(91.0);
        assert!(req.validate(Uuid::new_v4()).is_err());
    }

    #[test]
    fn conference_details_flatten_conference_fields() {
        let details = ConferenceDetails {
            conference: Conference {
                id: Uuid::new_v4(),
                title: "RustLab".into(),
                date: OffsetDateTime::UNIX_EPOCH,
                location: "Firenze".into(),
                website: None,
                latitude: None,
                longitude: None,
                created_by: None,
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            attendees: vec![Attendee::from(AttendeeRow {
                user_id: Uuid::new_v4(),
                name: "Ann".into(),
                nickname: None,
                city: Some("Pisa".into()),
                avatar_url: None,
                role: "speaker".into(),
                notes: None,
                needs_ride: true,
                has_car: false,
            })],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["title"], "RustLab");
        assert_eq!(json["attendees"][0]["user"]["city"], "Pisa");
        assert_eq!(json["attendees"][0]["needsRide"], true);
    }
}

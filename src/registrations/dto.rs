use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewRegistration, RegistrationWithConference, Role};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterToConferenceRequest {
    #[serde(default)]
    pub role: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub needs_ride: bool,
    #[serde(default)]
    pub has_car: bool,
}

impl RegisterToConferenceRequest {
    pub fn into_new(self, user_id: Uuid, conference_id: Uuid) -> NewRegistration {
        NewRegistration {
            user_id,
            conference_id,
            role: Role::from_free_text(&self.role),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            needs_ride: self.needs_ride,
            has_car: self.has_car,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub conference_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub conference_date: OffsetDateTime,
    pub conference_location: String,
    pub status: String,
    pub role: String,
    pub needs_ride: bool,
    pub has_car: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
}

impl From<RegistrationWithConference> for RegistrationSummary {
    fn from(r: RegistrationWithConference) -> Self {
        Self {
            id: r.id,
            conference_id: r.conference_id,
            conference_title: r.title,
            conference_date: r.date,
            conference_location: r.location,
            status: r.status,
            role: r.role,
            needs_ride: r.needs_ride,
            has_car: r.has_car,
            registered_at: r.registered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_normalises_role_and_blank_notes() {
        let req: RegisterToConferenceRequest =
            serde_json::from_str(r#"{"role":"organizer","notes":"  ","hasCar":true}"#).unwrap();
        let (user, conf) = (Uuid::new_v4(), Uuid::new_v4());
        let new = req.into_new(user, conf);
        assert_eq!(new.role, Role::Attendee);
        assert!(new.notes.is_none());
        assert!(new.has_car);
        assert!(!new.needs_ride);
        assert_eq!(new.user_id, user);
    }

    #[test]
    fn summary_uses_conference_prefixed_fields() {
        let summary = RegistrationSummary::from(RegistrationWithConference {
            id: Uuid::new_v4(),
            conference_id: Uuid::new_v4(),
            title: "RustLab".into(),
            date: OffsetDateTime::UNIX_EPOCH,
            location: "Firenze".into(),
            status: "registered".into(),
            role: "speaker".into(),
            needs_ride: false,
            has_car: true,
            registered_at: OffsetDateTime::UNIX_EPOCH,
        });
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["conferenceTitle"], "RustLab");
        assert_eq!(json["conferenceDate"], "1970-01-01T00:00:00Z");
        assert_eq!(json["hasCar"], true);
    }
}

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Roles a registration can carry. The value is free text on input; anything
/// unrecognised is treated as an attendee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Attendee,
    Speaker,
    Volunteer,
}

impl Role {
    pub fn from_free_text(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "speaker" => Role::Speaker,
            "volunteer" => Role::Volunteer,
            _ => Role::Attendee,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Attendee => "attendee",
            Role::Speaker => "speaker",
            Role::Volunteer => "volunteer",
        }
    }
}

/// Values of `conference_registrations.status` written by this service. The
/// schema also admits `waitlist` and `attended`.
pub mod status {
    pub const REGISTERED: &str = "registered";
    pub const CANCELLED: &str = "cancelled";
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conference_id: Uuid,
    pub status: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub needs_ride: bool,
    pub has_car: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cancelled_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub user_id: Uuid,
    pub conference_id: Uuid,
    pub role: Role,
    pub notes: Option<String>,
    pub needs_ride: bool,
    pub has_car: bool,
}

/// A user's registration joined with the conference it refers to.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationWithConference {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub title: String,
    pub date: OffsetDateTime,
    pub location: String,
    pub status: String,
    pub role: String,
    pub needs_ride: bool,
    pub has_car: bool,
    pub registered_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_fall_back_to_attendee() {
        assert_eq!(Role::from_free_text("Speaker"), Role::Speaker);
        assert_eq!(Role::from_free_text(" volunteer "), Role::Volunteer);
        assert_eq!(Role::from_free_text("keynote"), Role::Attendee);
        assert_eq!(Role::from_free_text(""), Role::Attendee);
        assert_eq!(Role::Speaker.as_str(), "speaker");
    }
}

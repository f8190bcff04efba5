//! Storage contracts for accounts, bearer tokens, conferences and
//! registrations.
//!
//! Handlers and the auth gate only see these traits. Uniqueness of emails,
//! token digests and (user, conference) registrations is enforced by the
//! backing store, never by a check in the handler.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::repo_types::{AuthToken, NewUser, ProfileUpdate, User},
    conferences::repo_types::{AttendeeRow, Conference, NewConference, RideFilter},
    registrations::repo_types::{NewRegistration, Registration, RegistrationWithConference},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; carries what was duplicated.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Duplicate("email")` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, token_hash: &str) -> Result<AuthToken, StoreError>;

    /// At most one record matches a digest.
    async fn find_by_digest(&self, token_hash: &str) -> Result<Option<AuthToken>, StoreError>;

    /// Sets `revoked`; repeated calls return the same state. `None` when the
    /// token does not exist or belongs to someone else.
    async fn revoke(&self, user_id: Uuid, token_id: Uuid)
        -> Result<Option<AuthToken>, StoreError>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AuthToken>, StoreError>;

    async fn touch(&self, token_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ConferenceStore: Send + Sync {
    /// Newest first; `upcoming` keeps only future dates, soonest first.
    async fn list(
        &self,
        location: Option<&str>,
        upcoming: bool,
    ) -> Result<Vec<Conference>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Conference>, StoreError>;
    async fn create_conference(&self, conference: NewConference) -> Result<Conference, StoreError>;

    /// Deletes only when `user_id` created the conference.
    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Non-cancelled registrations, in registration order.
    async fn attendees(&self, conference_id: Uuid) -> Result<Vec<AttendeeRow>, StoreError>;

    /// Active registrations needing or offering a ride, by user name.
    async fn riders(
        &self,
        conference_id: Uuid,
        filter: RideFilter,
    ) -> Result<Vec<AttendeeRow>, StoreError>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Inserts, or reactivates a cancelled registration for the same user and
    /// conference. An active one yields `Duplicate("registration")`.
    async fn register(&self, registration: NewRegistration) -> Result<Registration, StoreError>;

    /// Ordered by conference date.
    async fn list_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RegistrationWithConference>, StoreError>;

    /// Marks the active registration cancelled. `false` if there was none.
    async fn cancel(&self, user_id: Uuid, conference_id: Uuid) -> Result<bool, StoreError>;
}

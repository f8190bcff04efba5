use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConferenceStore, RegistrationStore, StoreError, TokenStore, UserStore};
use crate::{
    auth::repo_types::{AuthToken, NewUser, ProfileUpdate, User},
    conferences::repo_types::{AttendeeRow, Conference, NewConference, RideFilter},
    registrations::repo_types::{
        status, NewRegistration, Registration, RegistrationWithConference,
    },
};

/// In-process store with the same uniqueness and ordering rules as the SQL
/// schema. No method holds more than one lock at a time.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tokens: RwLock<HashMap<Uuid, AuthToken>>,
    conferences: RwLock<HashMap<Uuid, Conference>>,
    registrations: RwLock<HashMap<Uuid, Registration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            nickname: user.nickname,
            city: user.city,
            avatar_url: user.avatar_url,
            bio: user.bio,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if update.nickname.is_some() {
            user.nickname = update.nickname;
        }
        if update.city.is_some() {
            user.city = update.city;
        }
        if update.avatar_url.is_some() {
            user.avatar_url = update.avatar_url;
        }
        if update.bio.is_some() {
            user.bio = update.bio;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert(&self, user_id: Uuid, token_hash: &str) -> Result<AuthToken, StoreError> {
        let mut tokens = self.tokens.write().await;
        if tokens.values().any(|t| t.token_hash == token_hash) {
            return Err(StoreError::Duplicate("token"));
        }
        let token = AuthToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            revoked: false,
            created_at: OffsetDateTime::now_utc(),
            last_used_at: None,
        };
        tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_digest(&self, token_hash: &str) -> Result<Option<AuthToken>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.values().find(|t| t.token_hash == token_hash).cloned())
    }

    async fn revoke(
        &self,
        user_id: Uuid,
        token_id: Uuid,
    ) -> Result<Option<AuthToken>, StoreError> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(&token_id) {
            Some(t) if t.user_id == user_id => {
                t.revoked = true;
                Ok(Some(t.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AuthToken>, StoreError> {
        let tokens = self.tokens.read().await;
        let mut out: Vec<AuthToken> = tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn touch(&self, token_id: Uuid) -> Result<(), StoreError> {
        if let Some(t) = self.tokens.write().await.get_mut(&token_id) {
            t.last_used_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

impl MemoryStore {
    /// Joins registrations matching `keep` with their users.
    async fn attendee_rows(
        &self,
        conference_id: Uuid,
        keep: impl Fn(&Registration) -> bool,
    ) -> Vec<(Registration, AttendeeRow)> {
        let regs: Vec<Registration> = self
            .registrations
            .read()
            .await
            .values()
            .filter(|r| r.conference_id == conference_id && keep(r))
            .cloned()
            .collect();
        let users = self.users.read().await;
        regs.into_iter()
            .filter_map(|r| {
                let u = users.get(&r.user_id)?;
                let row = AttendeeRow {
                    user_id: u.id,
                    name: u.name.clone(),
                    nickname: u.nickname.clone(),
                    city: u.city.clone(),
                    avatar_url: u.avatar_url.clone(),
                    role: r.role.clone(),
                    notes: r.notes.clone(),
                    needs_ride: r.needs_ride,
                    has_car: r.has_car,
                };
                Some((r, row))
            })
            .collect()
    }
}

#[async_trait]
impl ConferenceStore for MemoryStore {
    async fn list(
        &self,
        location: Option<&str>,
        upcoming: bool,
    ) -> Result<Vec<Conference>, StoreError> {
        let needle = location.map(str::to_lowercase);
        let now = OffsetDateTime::now_utc();
        let mut out: Vec<Conference> = self
            .conferences
            .read()
            .await
            .values()
            .filter(|c| match &needle {
                Some(n) => c.location.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .filter(|c| !upcoming || c.date >= now)
            .cloned()
            .collect();
        if upcoming {
            out.sort_by(|a, b| a.date.cmp(&b.date));
        } else {
            out.sort_by(|a, b| b.date.cmp(&a.date));
        }
        Ok(out)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conference>, StoreError> {
        Ok(self.conferences.read().await.get(&id).cloned())
    }

    async fn create_conference(&self, c: NewConference) -> Result<Conference, StoreError> {
        let now = OffsetDateTime::now_utc();
        let created = Conference {
            id: Uuid::new_v4(),
            title: c.title,
            date: c.date,
            location: c.location,
            website: c.website,
            latitude: c.latitude,
            longitude: c.longitude,
            created_by: Some(c.created_by),
            created_at: now,
            updated_at: now,
        };
        self.conferences
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        {
            let mut conferences = self.conferences.write().await;
            let owned = matches!(conferences.get(&id), Some(c) if c.created_by == Some(user_id));
            if !owned {
                return Ok(false);
            }
            conferences.remove(&id);
        }
        // cascade
        self.registrations
            .write()
            .await
            .retain(|_, r| r.conference_id != id);
        Ok(true)
    }

    async fn attendees(&self, conference_id: Uuid) -> Result<Vec<AttendeeRow>, StoreError> {
        let mut rows = self
            .attendee_rows(conference_id, |r| r.status != status::CANCELLED)
            .await;
        rows.sort_by(|a, b| a.0.registered_at.cmp(&b.0.registered_at));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn riders(
        &self,
        conference_id: Uuid,
        filter: RideFilter,
    ) -> Result<Vec<AttendeeRow>, StoreError> {
        let wanted = |r: &Registration| match filter {
            RideFilter::Needing => r.needs_ride,
            RideFilter::Offering => r.has_car,
        };
        let mut rows: Vec<AttendeeRow> = self
            .attendee_rows(conference_id, |r| r.status == status::REGISTERED && wanted(r))
            .await
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn register(&self, r: NewRegistration) -> Result<Registration, StoreError> {
        let mut regs = self.registrations.write().await;
        let now = OffsetDateTime::now_utc();
        let existing = regs
            .values_mut()
            .find(|x| x.user_id == r.user_id && x.conference_id == r.conference_id);
        if let Some(reg) = existing {
            if reg.status != status::CANCELLED {
                return Err(StoreError::Duplicate("registration"));
            }
            reg.status = status::REGISTERED.to_string();
            reg.role = r.role.as_str().to_string();
            reg.notes = r.notes;
            reg.needs_ride = r.needs_ride;
            reg.has_car = r.has_car;
            reg.registered_at = now;
            reg.cancelled_at = None;
            return Ok(reg.clone());
        }

        let created = Registration {
            id: Uuid::new_v4(),
            user_id: r.user_id,
            conference_id: r.conference_id,
            status: status::REGISTERED.to_string(),
            role: r.role.as_str().to_string(),
            notes: r.notes,
            needs_ride: r.needs_ride,
            has_car: r.has_car,
            registered_at: now,
            cancelled_at: None,
        };
        regs.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RegistrationWithConference>, StoreError> {
        let regs: Vec<Registration> = self
            .registrations
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        let conferences = self.conferences.read().await;
        let mut out: Vec<RegistrationWithConference> = regs
            .into_iter()
            .filter_map(|r| {
                let c = conferences.get(&r.conference_id)?;
                Some(RegistrationWithConference {
                    id: r.id,
                    conference_id: r.conference_id,
                    title: c.title.clone(),
                    date: c.date,
                    location: c.location.clone(),
                    status: r.status,
                    role: r.role,
                    needs_ride: r.needs_ride,
                    has_car: r.has_car,
                    registered_at: r.registered_at,
                })
            })
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(out)
    }

    async fn cancel(&self, user_id: Uuid, conference_id: Uuid) -> Result<bool, StoreError> {
        let mut regs = self.registrations.write().await;
        let active = regs.values_mut().find(|r| {
            r.user_id == user_id
                && r.conference_id == conference_id
                && r.status != status::CANCELLED
        });
        match active {
            Some(r) => {
                r.status = status::CANCELLED.to_string();
                r.cancelled_at = Some(OffsetDateTime::now_utc());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{status, NewRegistration, Registration, RegistrationWithConference};
use crate::store::{postgres::classify, PgStore, RegistrationStore, StoreError};

const REGISTRATION_COLUMNS: &str = "id, user_id, conference_id, status, role, notes, \
                                    needs_ride, has_car, registered_at, cancelled_at";

#[async_trait]
impl RegistrationStore for PgStore {
    async fn register(&self, r: NewRegistration) -> Result<Registration, StoreError> {
        // The conflict update only fires for a cancelled row; an active one
        // returns nothing and is reported as a duplicate.
        let sql = format!(
            r#"
            INSERT INTO conference_registrations
                   (user_id, conference_id, role, notes, needs_ride, has_car)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, conference_id) DO UPDATE SET
                   status        = '{registered}',
                   role          = EXCLUDED.role,
                   notes         = EXCLUDED.notes,
                   needs_ride    = EXCLUDED.needs_ride,
                   has_car       = EXCLUDED.has_car,
                   registered_at = NOW(),
                   cancelled_at  = NULL
             WHERE conference_registrations.status = '{cancelled}'
            RETURNING {REGISTRATION_COLUMNS}
            "#,
            registered = status::REGISTERED,
            cancelled = status::CANCELLED,
        );
        let row = sqlx::query_as::<_, Registration>(&sql)
            .bind(r.user_id)
            .bind(r.conference_id)
            .bind(r.role.as_str())
            .bind(r.notes)
            .bind(r.needs_ride)
            .bind(r.has_car)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| classify(e, "registration", "insert registration"))?;
        row.ok_or(StoreError::Duplicate("registration"))
    }

    async fn list_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RegistrationWithConference>, StoreError> {
        let rows = sqlx::query_as::<_, RegistrationWithConference>(
            r#"
            SELECT r.id, r.conference_id, c.title, c.date, c.location,
                   r.status, r.role, r.needs_ride, r.has_car, r.registered_at
              FROM conference_registrations r
              JOIN conferences c ON c.id = r.conference_id
             WHERE r.user_id = $1
             ORDER BY c.date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list registrations by user")?;
        Ok(rows)
    }

    async fn cancel(&self, user_id: Uuid, conference_id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE conference_registrations
               SET status = $3, cancelled_at = NOW()
             WHERE user_id = $1 AND conference_id = $2 AND status <> $3
            "#,
        )
        .bind(user_id)
        .bind(conference_id)
        .bind(status::CANCELLED)
        .execute(&self.db)
        .await
        .context("cancel registration")?;
        Ok(res.rows_affected() > 0)
    }
}

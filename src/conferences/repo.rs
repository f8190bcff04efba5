use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{AttendeeRow, Conference, NewConference, RideFilter};
use crate::{
    registrations::repo_types::status,
    store::{ConferenceStore, PgStore, StoreError},
};

const CONFERENCE_COLUMNS: &str = "id, title, date, location, website, latitude, longitude, \
                                  created_by, created_at, updated_at";

const ATTENDEE_SELECT: &str = r#"
        SELECT u.id AS user_id, u.name, u.nickname, u.city, u.avatar_url,
               r.role, r.notes, r.needs_ride, r.has_car
          FROM conference_registrations r
          JOIN users u ON u.id = r.user_id
"#;

#[async_trait]
impl ConferenceStore for PgStore {
    async fn list(
        &self,
        location: Option<&str>,
        upcoming: bool,
    ) -> Result<Vec<Conference>, StoreError> {
        let sql = format!(
            r#"
            SELECT {CONFERENCE_COLUMNS}
              FROM conferences
             WHERE ($1::TEXT IS NULL OR location ILIKE '%' || $1 || '%')
               AND (NOT $2 OR date >= NOW())
             ORDER BY CASE WHEN $2 THEN date END ASC, date DESC
            "#
        );
        let rows = sqlx::query_as::<_, Conference>(&sql)
            .bind(location)
            .bind(upcoming)
            .fetch_all(&self.db)
            .await
            .context("list conferences")?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conference>, StoreError> {
        let sql = format!("SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE id = $1");
        let row = sqlx::query_as::<_, Conference>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get conference")?;
        Ok(row)
    }

    async fn create_conference(&self, c: NewConference) -> Result<Conference, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO conferences (title, date, location, website, latitude, longitude, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CONFERENCE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Conference>(&sql)
            .bind(c.title)
            .bind(c.date)
            .bind(c.location)
            .bind(c.website)
            .bind(c.latitude)
            .bind(c.longitude)
            .bind(c.created_by)
            .fetch_one(&self.db)
            .await
            .context("insert conference")?;
        Ok(row)
    }

    async fn delete_owned(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM conferences WHERE id = $1 AND created_by = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete conference")?;
        Ok(res.rows_affected() > 0)
    }

    async fn attendees(&self, conference_id: Uuid) -> Result<Vec<AttendeeRow>, StoreError> {
        let sql = format!(
            "{ATTENDEE_SELECT} WHERE r.conference_id = $1 AND r.status <> $2 \
             ORDER BY r.registered_at ASC"
        );
        let rows = sqlx::query_as::<_, AttendeeRow>(&sql)
            .bind(conference_id)
            .bind(status::CANCELLED)
            .fetch_all(&self.db)
            .await
            .context("list attendees")?;
        Ok(rows)
    }

    async fn riders(
        &self,
        conference_id: Uuid,
        filter: RideFilter,
    ) -> Result<Vec<AttendeeRow>, StoreError> {
        let column = match filter {
            RideFilter::Needing => "needs_ride",
            RideFilter::Offering => "has_car",
        };
        let sql = format!(
            "{ATTENDEE_SELECT} WHERE r.conference_id = $1 AND r.status = $2 AND r.{column} \
             ORDER BY u.name ASC"
        );
        let rows = sqlx::query_as::<_, AttendeeRow>(&sql)
            .bind(conference_id)
            .bind(status::REGISTERED)
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("list riders ({column})"))?;
        Ok(rows)
    }
}

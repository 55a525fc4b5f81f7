use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    ActivityReader, ActivityStore, EventReader, EventStore, ParticipantStore, StoreError,
    StoreResult,
};
use crate::models::{normalize_email, Activity, Event, Participant, ScanRecord};

const PARTICIPANT_EMAIL_CONSTRAINT: &str = "participants_event_id_email_key";
const ACTIVITY_QR_CONSTRAINT: &str = "activities_qr_id_key";

/// Postgres-backed entity store.
///
/// Scan uniqueness is enforced by the `participant_scans` primary key on
/// `(participant_id, activity_id)`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    event_id: Uuid,
    qr_id: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    email: String,
    qr_sent: bool,
}

#[derive(sqlx::FromRow)]
struct ScanRow {
    participant_id: Uuid,
    activity_id: Uuid,
    scanned_at: DateTime<Utc>,
}

impl ParticipantRow {
    fn into_participant(self, scanned_activities: Vec<ScanRecord>) -> Participant {
        Participant {
            id: self.id,
            event_id: self.event_id,
            name: self.name,
            email: self.email,
            scanned_activities,
            qr_sent: self.qr_sent,
        }
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
        }
    }
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity {
            id: row.id,
            event_id: row.event_id,
            qr_id: row.qr_id,
            name: row.name,
        }
    }
}

impl From<ScanRow> for ScanRecord {
    fn from(row: ScanRow) -> Self {
        ScanRecord {
            activity_id: row.activity_id,
            scanned_at: row.scanned_at,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> sqlx::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }
}

#[async_trait]
impl EventReader for PgStore {
    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>("SELECT id, name FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Event::from))
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn create_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query("INSERT INTO events (id, name) VALUES ($1, $2)")
            .bind(event.id)
            .bind(&event.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>("SELECT id, name FROM events ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool> {
        // Activities, participants and scans go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ActivityReader for PgStore {
    async fn find_activity_by_qr(&self, qr_id: &str) -> StoreResult<Option<Activity>> {
        let row = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, event_id, qr_id, name FROM activities WHERE qr_id = $1",
        )
        .bind(qr_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Activity::from))
    }
}

#[async_trait]
impl ActivityStore for PgStore {
    async fn create_activity(&self, activity: &Activity) -> StoreResult<()> {
        let result =
            sqlx::query("INSERT INTO activities (id, event_id, qr_id, name) VALUES ($1, $2, $3, $4)")
                .bind(activity.id)
                .bind(activity.event_id)
                .bind(&activity.qr_id)
                .bind(&activity.name)
                .execute(&self.pool)
                .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some(ACTIVITY_QR_CONSTRAINT) =>
            {
                Err(StoreError::DuplicateQrId)
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn find_activity(&self, activity_id: Uuid) -> StoreResult<Option<Activity>> {
        let row = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, event_id, qr_id, name FROM activities WHERE id = $1",
        )
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Activity::from))
    }

    async fn list_activities(&self, event_id: Uuid) -> StoreResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, event_id, qr_id, name FROM activities WHERE event_id = $1 ORDER BY name, qr_id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }
}

#[async_trait]
impl ParticipantStore for PgStore {
    async fn find_participant(&self, participant_id: Uuid) -> StoreResult<Option<Participant>> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, event_id, name, email, qr_sent FROM participants WHERE id = $1",
        )
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let scans = sqlx::query_as::<_, ScanRow>(
            "SELECT participant_id, activity_id, scanned_at FROM participant_scans WHERE participant_id = $1 ORDER BY scanned_at",
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(
            row.into_participant(scans.into_iter().map(ScanRecord::from).collect()),
        ))
    }

    async fn list_participants(&self, event_id: Uuid) -> StoreResult<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, event_id, name, email, qr_sent FROM participants WHERE event_id = $1 ORDER BY email",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let scans = sqlx::query_as::<_, ScanRow>(
            r#"SELECT s.participant_id, s.activity_id, s.scanned_at
               FROM participant_scans s
               JOIN participants p ON p.id = s.participant_id
               WHERE p.event_id = $1
               ORDER BY s.scanned_at"#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_participant: HashMap<Uuid, Vec<ScanRecord>> = HashMap::new();
        for scan in scans {
            by_participant
                .entry(scan.participant_id)
                .or_default()
                .push(scan.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let scans = by_participant.remove(&row.id).unwrap_or_default();
                row.into_participant(scans)
            })
            .collect())
    }

    async fn insert_participant(&self, participant: &Participant) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO participants (id, event_id, name, email, qr_sent) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(participant.id)
        .bind(participant.event_id)
        .bind(&participant.name)
        .bind(normalize_email(&participant.email))
        .bind(participant.qr_sent)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some(PARTICIPANT_EMAIL_CONSTRAINT) =>
            {
                Err(StoreError::DuplicateEmail)
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn append_scan_if_absent(
        &self,
        participant_id: Uuid,
        scan: &ScanRecord,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO participant_scans (participant_id, activity_id, scanned_at)
               VALUES ($1, $2, $3)
               ON CONFLICT (participant_id, activity_id) DO NOTHING"#,
        )
        .bind(participant_id)
        .bind(scan.activity_id)
        .bind(scan.scanned_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_qr_sent(&self, participant_id: Uuid, sent: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE participants SET qr_sent = $2 WHERE id = $1")
            .bind(participant_id)
            .bind(sent)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MissingParticipant(participant_id));
        }
        Ok(())
    }
}

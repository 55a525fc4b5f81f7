//! Entity lookup and persistence seams used by check-in and dispatch.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Activity, Event, Participant, ScanRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("participant email already registered for this event")]
    DuplicateEmail,
    #[error("activity QR id already in use")]
    DuplicateQrId,
    #[error("participant {0} does not exist")]
    MissingParticipant(Uuid),
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EventReader: Send + Sync {
    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>>;
}

/// Event administration on top of lookups.
#[async_trait]
pub trait EventStore: EventReader {
    async fn create_event(&self, event: &Event) -> StoreResult<()>;

    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    /// Removes the event with its activities and participants. Returns `false` when the
    /// event did not exist.
    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ActivityReader: Send + Sync {
    async fn find_activity_by_qr(&self, qr_id: &str) -> StoreResult<Option<Activity>>;
}

#[async_trait]
pub trait ActivityStore: ActivityReader {
    /// Fails with `DuplicateQrId` when any activity already uses the QR id.
    async fn create_activity(&self, activity: &Activity) -> StoreResult<()>;

    async fn find_activity(&self, activity_id: Uuid) -> StoreResult<Option<Activity>>;

    async fn list_activities(&self, event_id: Uuid) -> StoreResult<Vec<Activity>>;
}

#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn find_participant(&self, participant_id: Uuid) -> StoreResult<Option<Participant>>;

    async fn list_participants(&self, event_id: Uuid) -> StoreResult<Vec<Participant>>;

    /// Fails with `DuplicateEmail` when the event already has a participant with that email.
    async fn insert_participant(&self, participant: &Participant) -> StoreResult<()>;

    /// Conditional write keyed on `(participant_id, scan.activity_id)`.
    ///
    /// Returns `false` without writing when the pair is already recorded. Implementations
    /// must make the check and the append a single atomic step.
    async fn append_scan_if_absent(
        &self,
        participant_id: Uuid,
        scan: &ScanRecord,
    ) -> StoreResult<bool>;

    async fn set_qr_sent(&self, participant_id: Uuid, sent: bool) -> StoreResult<()>;
}

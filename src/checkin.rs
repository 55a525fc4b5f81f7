use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{ActivityReader, EventReader, ParticipantStore, StoreError};
use crate::error::AppError;
use crate::models::{Activity, ScanRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Event,
    Participant,
    Activity,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Event => "Event",
            Entity::Participant => "Participant",
            Entity::Activity => "Activity",
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{} not found", .0.as_str())]
    NotFound(Entity),
    #[error("participant scope mismatch")]
    ParticipantScopeMismatch,
    #[error("activity scope mismatch")]
    ActivityScopeMismatch,
    #[error("Activity already scanned")]
    AlreadyScanned,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::NotFound(entity) => AppError::NotFound(entity.as_str().to_string()),
            ScanError::ParticipantScopeMismatch => {
                AppError::Forbidden("Participant does not belong to this event".to_string())
            }
            ScanError::ActivityScopeMismatch => {
                AppError::Forbidden("Activity does not belong to this event".to_string())
            }
            ScanError::AlreadyScanned => AppError::Conflict("Activity already scanned".to_string()),
            ScanError::Store(err) => AppError::Store(err),
        }
    }
}

/// Result of a successful scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanReceipt {
    pub participant_id: Uuid,
    pub activity: Activity,
    pub scan: ScanRecord,
}

/// Scoped, idempotent check-in transitions.
#[derive(Clone)]
pub struct CheckInRegistry {
    events: Arc<dyn EventReader>,
    activities: Arc<dyn ActivityReader>,
    participants: Arc<dyn ParticipantStore>,
}

impl CheckInRegistry {
    pub fn new(
        events: Arc<dyn EventReader>,
        activities: Arc<dyn ActivityReader>,
        participants: Arc<dyn ParticipantStore>,
    ) -> Self {
        Self {
            events,
            activities,
            participants,
        }
    }

    /// Records that `participant_id` completed the activity whose external code is
    /// `activity_qr_id` within `event_id`.
    ///
    /// Lookups run event, participant, activity; scope is checked participant first so the
    /// two mismatch kinds stay distinguishable. The final append is the store's conditional
    /// write, so concurrent scans of the same pair record exactly one entry.
    pub async fn register_scan(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
        activity_qr_id: &str,
    ) -> Result<ScanReceipt, ScanError> {
        self.events
            .find_event(event_id)
            .await?
            .ok_or(ScanError::NotFound(Entity::Event))?;
        let participant = self
            .participants
            .find_participant(participant_id)
            .await?
            .ok_or(ScanError::NotFound(Entity::Participant))?;
        let activity = self
            .activities
            .find_activity_by_qr(activity_qr_id)
            .await?
            .ok_or(ScanError::NotFound(Entity::Activity))?;

        if participant.event_id != event_id {
            tracing::warn!(%event_id, %participant_id, "participant scanned outside its event");
            return Err(ScanError::ParticipantScopeMismatch);
        }
        if activity.event_id != event_id {
            tracing::warn!(%event_id, activity_id = %activity.id, "activity scanned outside its event");
            return Err(ScanError::ActivityScopeMismatch);
        }

        if participant.has_scanned(activity.id) {
            return Err(ScanError::AlreadyScanned);
        }

        let scan = ScanRecord {
            activity_id: activity.id,
            scanned_at: Utc::now(),
        };
        if !self
            .participants
            .append_scan_if_absent(participant_id, &scan)
            .await?
        {
            return Err(ScanError::AlreadyScanned);
        }

        tracing::info!(%event_id, %participant_id, activity_id = %activity.id, "activity scanned");
        Ok(ScanReceipt {
            participant_id,
            activity,
            scan,
        })
    }
}

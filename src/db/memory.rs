use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    ActivityReader, ActivityStore, EventReader, EventStore, ParticipantStore, StoreError,
    StoreResult,
};
use crate::models::{normalize_email, Activity, Event, Participant, ScanRecord};

/// In-process entity store.
///
/// Scan appends run under the participant's shard lock, so the membership check and the
/// push cannot interleave with another append for the same participant.
#[derive(Default)]
pub struct MemoryStore {
    events: DashMap<Uuid, Event>,
    activities: DashMap<Uuid, Activity>,
    participants: DashMap<Uuid, Participant>,
    emails: DashMap<(Uuid, String), Uuid>,
    qr_ids: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    pub fn insert_activity(&self, activity: Activity) {
        self.qr_ids.insert(activity.qr_id.clone(), activity.id);
        self.activities.insert(activity.id, activity);
    }

    pub fn participant(&self, participant_id: Uuid) -> Option<Participant> {
        self.participants
            .get(&participant_id)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl EventReader for MemoryStore {
    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.events.get(&event_id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, event: &Event) -> StoreResult<()> {
        self.insert_event(event.clone());
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.events.iter().map(|entry| entry.value().clone()).collect();
        events.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool> {
        if self.events.remove(&event_id).is_none() {
            return Ok(false);
        }
        let mut freed = Vec::new();
        self.activities.retain(|_, activity| {
            if activity.event_id == event_id {
                freed.push(activity.qr_id.clone());
                false
            } else {
                true
            }
        });
        for qr_id in freed {
            self.qr_ids.remove(&qr_id);
        }
        self.participants
            .retain(|_, participant| participant.event_id != event_id);
        self.emails.retain(|(owner, _), _| *owner != event_id);
        Ok(true)
    }
}

#[async_trait]
impl ActivityReader for MemoryStore {
    async fn find_activity_by_qr(&self, qr_id: &str) -> StoreResult<Option<Activity>> {
        let Some(activity_id) = self.qr_ids.get(qr_id).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self
            .activities
            .get(&activity_id)
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn create_activity(&self, activity: &Activity) -> StoreResult<()> {
        match self.qr_ids.entry(activity.qr_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateQrId),
            Entry::Vacant(vacant) => {
                vacant.insert(activity.id);
                self.activities.insert(activity.id, activity.clone());
                Ok(())
            }
        }
    }

    async fn find_activity(&self, activity_id: Uuid) -> StoreResult<Option<Activity>> {
        Ok(self
            .activities
            .get(&activity_id)
            .map(|entry| entry.value().clone()))
    }

    async fn list_activities(&self, event_id: Uuid) -> StoreResult<Vec<Activity>> {
        let mut activities: Vec<Activity> = self
            .activities
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .map(|entry| entry.value().clone())
            .collect();
        activities.sort_by(|a, b| a.name.cmp(&b.name).then(a.qr_id.cmp(&b.qr_id)));
        Ok(activities)
    }
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn find_participant(&self, participant_id: Uuid) -> StoreResult<Option<Participant>> {
        Ok(self.participant(participant_id))
    }

    async fn list_participants(&self, event_id: Uuid) -> StoreResult<Vec<Participant>> {
        let mut participants: Vec<Participant> = self
            .participants
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .map(|entry| entry.value().clone())
            .collect();
        participants.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(participants)
    }

    async fn insert_participant(&self, participant: &Participant) -> StoreResult<()> {
        let key = (participant.event_id, normalize_email(&participant.email));
        match self.emails.entry(key) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(vacant) => {
                vacant.insert(participant.id);
                self.participants
                    .insert(participant.id, participant.clone());
                Ok(())
            }
        }
    }

    async fn append_scan_if_absent(
        &self,
        participant_id: Uuid,
        scan: &ScanRecord,
    ) -> StoreResult<bool> {
        let mut participant = self
            .participants
            .get_mut(&participant_id)
            .ok_or(StoreError::MissingParticipant(participant_id))?;
        if participant.has_scanned(scan.activity_id) {
            return Ok(false);
        }
        participant.scanned_activities.push(scan.clone());
        Ok(true)
    }

    async fn set_qr_sent(&self, participant_id: Uuid, sent: bool) -> StoreResult<()> {
        let mut participant = self
            .participants
            .get_mut(&participant_id)
            .ok_or(StoreError::MissingParticipant(participant_id))?;
        participant.qr_sent = sent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    #[tokio::test]
    async fn duplicate_email_in_same_event_is_rejected() {
        let store = MemoryStore::new();
        let event_id = Uuid::new_v4();
        store
            .insert_participant(&Participant::new(event_id, "Ada", "ada@example.com"))
            .await
            .unwrap();
        let err = store
            .insert_participant(&Participant::new(event_id, "Ada", " ADA@example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        store
            .insert_participant(&Participant::new(Uuid::new_v4(), "Ada", "ada@example.com"))
            .await
            .expect("same email in another event is allowed");
    }

    #[tokio::test]
    async fn qr_ids_are_unique_across_events() {
        let store = MemoryStore::new();
        let activity = |event_id, qr_id: &str| Activity {
            id: Uuid::new_v4(),
            event_id,
            qr_id: qr_id.to_string(),
            name: "Workshop".to_string(),
        };
        let first = activity(Uuid::new_v4(), "A1");
        store.create_activity(&first).await.unwrap();
        let err = store
            .create_activity(&activity(Uuid::new_v4(), "A1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateQrId));
        assert_eq!(store.find_activity_by_qr("A1").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn deleting_an_event_drops_its_entities() {
        let store = MemoryStore::new();
        let kept = Event {
            id: Uuid::new_v4(),
            name: "Kept".into(),
        };
        let dropped = Event {
            id: Uuid::new_v4(),
            name: "Dropped".into(),
        };
        store.create_event(&kept).await.unwrap();
        store.create_event(&dropped).await.unwrap();
        store
            .create_activity(&Activity {
                id: Uuid::new_v4(),
                event_id: dropped.id,
                qr_id: "D1".into(),
                name: "Talk".into(),
            })
            .await
            .unwrap();
        let participant = Participant::new(dropped.id, "Ada", "ada@example.com");
        store.insert_participant(&participant).await.unwrap();

        assert!(store.delete_event(dropped.id).await.unwrap());
        assert!(!store.delete_event(dropped.id).await.unwrap());
        assert_eq!(store.list_events().await.unwrap(), vec![kept]);
        assert!(store.find_activity_by_qr("D1").await.unwrap().is_none());
        assert!(store.participant(participant.id).is_none());

        // Freed QR ids and emails can be reused.
        let reborn = Event {
            id: Uuid::new_v4(),
            name: "Reborn".into(),
        };
        store.create_event(&reborn).await.unwrap();
        store
            .create_activity(&Activity {
                id: Uuid::new_v4(),
                event_id: reborn.id,
                qr_id: "D1".into(),
                name: "Talk".into(),
            })
            .await
            .unwrap();
        store
            .insert_participant(&Participant::new(dropped.id, "Ada", "ada@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_appends_record_a_single_scan() {
        let store = Arc::new(MemoryStore::new());
        let participant = Participant::new(Uuid::new_v4(), "Grace", "grace@example.com");
        store.insert_participant(&participant).await.unwrap();
        let scan = ScanRecord {
            activity_id: Uuid::new_v4(),
            scanned_at: Utc::now(),
        };

        let participant_id = participant.id;
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let scan = scan.clone();
            handles.push(tokio::spawn(async move {
                store.append_scan_if_absent(participant_id, &scan).await
            }));
        }
        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(
            store.participant(participant.id).unwrap().scanned_activities.len(),
            1
        );
    }
}

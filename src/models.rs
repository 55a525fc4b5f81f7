use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
}

/// Activities are addressed externally by `qr_id`, never by their internal id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub event_id: Uuid,
    pub qr_id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub activity_id: Uuid,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub scanned_activities: Vec<ScanRecord>,
    #[serde(default)]
    pub qr_sent: bool,
}

impl Participant {
    pub fn new(event_id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            name: name.into(),
            email: email.into(),
            scanned_activities: Vec::new(),
            qr_sent: false,
        }
    }

    pub fn has_scanned(&self, activity_id: Uuid) -> bool {
        self.scanned_activities
            .iter()
            .any(|scan| scan.activity_id == activity_id)
    }
}

/// Trimmed, lower-cased form used for uniqueness of `(event_id, email)`.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

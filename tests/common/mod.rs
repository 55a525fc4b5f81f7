#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use checkin::config::{AuthConfig, DispatchConfig};
use checkin::db::MemoryStore;
use checkin::keystore::{KeyStore, MemoryKeyStore};
use checkin::models::{Activity, Event, Participant};
use checkin::notify::FileAttachmentProvider;
use checkin::AppServices;

pub const ADMIN_KEY: &str = "ADMIN123";
pub const ORGANIZER_KEY: &str = "ORG-KEY-1";
pub const SCANNER_KEY: &str = "SCAN-KEY-1";

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub keystore: Arc<MemoryKeyStore>,
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(ADMIN_KEY, "organizerKey", "scannerKey").unwrap()
}

pub async fn test_app(dispatch: DispatchConfig, assets: &Path) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let keystore = Arc::new(MemoryKeyStore::new());
    keystore
        .set("organizerKey", &json!(ORGANIZER_KEY), None)
        .await
        .unwrap();
    keystore
        .set("scannerKey", &json!(SCANNER_KEY), None)
        .await
        .unwrap();
    let services = AppServices::new(
        &auth_config(),
        dispatch,
        store.clone(),
        keystore.clone(),
        Arc::new(FileAttachmentProvider::new(assets)),
    )
    .unwrap();
    TestApp {
        app: checkin::app(services),
        store,
        keystore,
    }
}

impl TestApp {
    pub fn event(&self, name: &str) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.store.insert_event(event.clone());
        event
    }

    pub fn activity(&self, event: &Event, qr_id: &str) -> Activity {
        let activity = Activity {
            id: Uuid::new_v4(),
            event_id: event.id,
            qr_id: qr_id.to_string(),
            name: qr_id.to_string(),
        };
        self.store.insert_activity(activity.clone());
        activity
    }

    pub async fn participant(&self, event: &Event, email: &str) -> Participant {
        use checkin::db::ParticipantStore;
        let participant = Participant::new(event.id, "Ada", email);
        self.store.insert_participant(&participant).await.unwrap();
        participant
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

use std::sync::Arc;

use crate::auth::{Authorizer, RoleKeyRegistry};
use crate::checkin::CheckInRegistry;
use crate::config::{AuthConfig, DispatchConfig};
use crate::db::{ActivityReader, ActivityStore, EventReader, EventStore, ParticipantStore, PgStore};
use crate::keystore::{DurableStream, KeyStore};
use crate::notify::{AttachmentProvider, DeliveryError, NotificationDispatcher};

/// Handles shared by every request, installed as an `Extension` layer.
#[derive(Clone)]
pub struct AppServices {
    pub authorizer: Arc<Authorizer>,
    pub checkin: CheckInRegistry,
    pub dispatcher: NotificationDispatcher,
    pub keys: RoleKeyRegistry,
    pub events: Arc<dyn EventStore>,
    pub activities: Arc<dyn ActivityStore>,
    pub participants: Arc<dyn ParticipantStore>,
    pub keystore: Arc<dyn KeyStore>,
    /// Present when entities live in Postgres; used by the database health probe.
    pub database: Option<PgStore>,
}

impl AppServices {
    /// Wires every component from one entity store and one key store.
    pub fn new<S, K>(
        auth: &AuthConfig,
        dispatch: DispatchConfig,
        store: Arc<S>,
        keystore: Arc<K>,
        attachments: Arc<dyn AttachmentProvider>,
    ) -> Result<Self, DeliveryError>
    where
        S: EventStore + ActivityStore + ParticipantStore + 'static,
        K: KeyStore + DurableStream + 'static,
    {
        let events: Arc<dyn EventStore> = store.clone();
        let activities: Arc<dyn ActivityStore> = store.clone();
        let event_reader: Arc<dyn EventReader> = store.clone();
        let activity_reader: Arc<dyn ActivityReader> = store.clone();
        let participants: Arc<dyn ParticipantStore> = store;
        let stream: Arc<dyn DurableStream> = keystore.clone();
        let keystore: Arc<dyn KeyStore> = keystore;

        let dispatcher =
            NotificationDispatcher::from_config(dispatch, stream, participants.clone(), attachments)?;
        Ok(Self {
            authorizer: Arc::new(Authorizer::from_config(auth, keystore.clone())),
            checkin: CheckInRegistry::new(event_reader, activity_reader, participants.clone()),
            dispatcher,
            keys: RoleKeyRegistry::new(keystore.clone(), auth),
            events,
            activities,
            participants,
            keystore,
            database: None,
        })
    }

    pub fn with_database(mut self, database: PgStore) -> Self {
        self.database = Some(database);
        self
    }
}

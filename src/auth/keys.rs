use rand_core::{OsRng, RngCore};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::roles::{fingerprint, ProvisionedRole};
use crate::config::AuthConfig;
use crate::keystore::{KeyStore, KeyStoreResult};

const KEY_BYTES: usize = 32;

/// Provisioning side of the organizer and scanner keys.
#[derive(Clone)]
pub struct RoleKeyRegistry {
    store: Arc<dyn KeyStore>,
    organizer_key_id: String,
    scanner_key_id: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RoleKeyStatus {
    pub role: ProvisionedRole,
    pub key_id: String,
    pub provisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Clone, Serialize)]
pub struct IssuedRoleKey {
    pub role: ProvisionedRole,
    pub key_id: String,
    pub key: String,
    pub fingerprint: String,
}

impl RoleKeyRegistry {
    pub fn new(store: Arc<dyn KeyStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            organizer_key_id: config.organizer_key_id.clone(),
            scanner_key_id: config.scanner_key_id.clone(),
        }
    }

    pub fn key_id(&self, role: ProvisionedRole) -> &str {
        match role {
            ProvisionedRole::Organizer => &self.organizer_key_id,
            ProvisionedRole::Scanner => &self.scanner_key_id,
        }
    }

    /// Creates any missing organizer/scanner key. Existing keys are left untouched, also
    /// when several instances bootstrap at once.
    pub async fn bootstrap(&self) -> KeyStoreResult<Vec<ProvisionedRole>> {
        let mut created = Vec::new();
        for role in ProvisionedRole::ALL {
            let key_id = self.key_id(role);
            let value = generate_key();
            if self
                .store
                .set_if_absent(key_id, &Value::String(value.clone()))
                .await?
            {
                tracing::info!(%key_id, role = ?role, key = %fingerprint(&value), "provisioned role key");
                created.push(role);
            }
        }
        Ok(created)
    }

    /// Replaces the key for `role` with a fresh random value.
    pub async fn issue(&self, role: ProvisionedRole) -> KeyStoreResult<IssuedRoleKey> {
        let key_id = self.key_id(role).to_string();
        let key = generate_key();
        self.store
            .set(&key_id, &Value::String(key.clone()), None)
            .await?;
        let fingerprint = fingerprint(&key);
        tracing::info!(%key_id, role = ?role, key = %fingerprint, "issued role key");
        Ok(IssuedRoleKey {
            role,
            key_id,
            key,
            fingerprint,
        })
    }

    pub async fn reveal(&self, role: ProvisionedRole) -> KeyStoreResult<Option<IssuedRoleKey>> {
        let key_id = self.key_id(role).to_string();
        let value = self.store.get(&key_id).await?;
        Ok(value.and_then(scalar).map(|key| IssuedRoleKey {
            role,
            fingerprint: fingerprint(&key),
            key_id,
            key,
        }))
    }

    pub async fn status(&self) -> KeyStoreResult<Vec<RoleKeyStatus>> {
        let mut statuses = Vec::with_capacity(ProvisionedRole::ALL.len());
        for role in ProvisionedRole::ALL {
            let key_id = self.key_id(role).to_string();
            let value = self.store.get(&key_id).await?.and_then(scalar);
            statuses.push(RoleKeyStatus {
                role,
                key_id,
                provisioned: value.is_some(),
                fingerprint: value.as_deref().map(fingerprint),
            });
        }
        Ok(statuses)
    }
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::roles::{credentials_match, fingerprint, AuthContext, ProvisionedRole, Role};
use crate::config::AuthConfig;
use crate::keystore::{KeyStore, KeyStoreError, KeyStoreResult};

/// Organizer and scanner key values as read from the key store. `None` means the key has
/// not been provisioned, which matches no credential.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProvisionedKeys {
    pub organizer: Option<String>,
    pub scanner: Option<String>,
}

impl ProvisionedKeys {
    pub fn get(&self, role: ProvisionedRole) -> Option<&str> {
        match role {
            ProvisionedRole::Organizer => self.organizer.as_deref(),
            ProvisionedRole::Scanner => self.scanner.as_deref(),
        }
    }

    fn role_for(&self, credential: &str) -> Option<Role> {
        ProvisionedRole::ALL.into_iter().find_map(|role| {
            self.get(role)
                .filter(|expected| credentials_match(credential, expected))
                .map(|_| role.role())
        })
    }
}

/// Source of the role-to-key mapping.
///
/// Cache policy: resolvers return one snapshot per authorization check and keep nothing
/// afterwards, so a rotated key takes effect on the next request. A resolver that does
/// cache must drop its state in `invalidate`.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn provisioned_keys(&self) -> KeyStoreResult<ProvisionedKeys>;

    fn invalidate(&self) {}
}

pub struct KeyStoreRoleResolver {
    store: Arc<dyn KeyStore>,
    organizer_key_id: String,
    scanner_key_id: String,
}

impl KeyStoreRoleResolver {
    pub fn new(store: Arc<dyn KeyStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            organizer_key_id: config.organizer_key_id.clone(),
            scanner_key_id: config.scanner_key_id.clone(),
        }
    }

    async fn read(&self, key_id: &str) -> KeyStoreResult<Option<String>> {
        let value = self.store.get(key_id).await?;
        Ok(value.and_then(|value| key_value(key_id, value)))
    }
}

/// Keys are stored as JSON scalars; anything else is treated as not provisioned.
fn key_value(key_id: &str, value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => None,
        other => {
            tracing::warn!(key_id, kind = ?other, "ignoring non-scalar role key value");
            None
        }
    }
}

#[async_trait]
impl RoleResolver for KeyStoreRoleResolver {
    async fn provisioned_keys(&self) -> KeyStoreResult<ProvisionedKeys> {
        let (organizer, scanner) = tokio::try_join!(
            self.read(&self.organizer_key_id),
            self.read(&self.scanner_key_id)
        )?;
        Ok(ProvisionedKeys { organizer, scanner })
    }
}

/// Resolves a request credential to an [`AuthContext`]. Fails closed: a key store error
/// yields `ready == false`, never `anonymous`.
pub struct Authorizer {
    admin_key: String,
    resolver: Arc<dyn RoleResolver>,
}

impl Authorizer {
    pub fn new(admin_key: impl Into<String>, resolver: Arc<dyn RoleResolver>) -> Self {
        Self {
            admin_key: admin_key.into(),
            resolver,
        }
    }

    pub fn from_config(config: &AuthConfig, store: Arc<dyn KeyStore>) -> Self {
        let resolver = Arc::new(KeyStoreRoleResolver::new(store, config));
        Self::new(config.admin_key.clone(), resolver)
    }

    pub fn resolver(&self) -> &Arc<dyn RoleResolver> {
        &self.resolver
    }

    pub async fn resolve_role(&self, credential: Option<&str>) -> AuthContext {
        let credential = match credential.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return AuthContext::anonymous(),
        };

        if credentials_match(credential, &self.admin_key) {
            return AuthContext::verified(Role::Admin);
        }

        match self.resolver.provisioned_keys().await {
            Ok(keys) => {
                let role = keys.role_for(credential).unwrap_or(Role::Anonymous);
                if role == Role::Anonymous {
                    tracing::debug!(key = %fingerprint(credential), "credential matched no role");
                }
                AuthContext::verified(role)
            }
            Err(err) => {
                tracing::warn!(error = %err, "role key lookup failed; denying request");
                AuthContext::unavailable(describe(&err))
            }
        }
    }
}

fn describe(err: &KeyStoreError) -> String {
    match err {
        KeyStoreError::Unavailable(_) | KeyStoreError::Closed => "key store unreachable".to_string(),
        KeyStoreError::Command { command, .. } => format!("key store command {command} failed"),
        KeyStoreError::Decode { .. } => "role key value is corrupt".to_string(),
    }
}

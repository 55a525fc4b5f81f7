//! Key-value store used for provisioned role keys and the durable email stream.

mod memory;
mod redis_store;

pub use self::memory::MemoryKeyStore;
pub use self::redis_store::RedisKeyStore;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key store unavailable: {0}")]
    Unavailable(String),
    #[error("key store command `{command}` failed: {reason}")]
    Command { command: &'static str, reason: String },
    #[error("stored value for `{key}` is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("key store connection is closed")]
    Closed,
}

pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Health probe result for the `/health/keystore` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreHealth {
    Healthy { ping: String },
    Unhealthy { error: String },
}

/// Values are stored JSON-encoded so that scalars round-trip with their type.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// `Ok(None)` means the key is absent. Backend failures are always `Err`.
    async fn get(&self, key: &str) -> KeyStoreResult<Option<Value>>;
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> KeyStoreResult<()>;
    /// Atomic insert; returns `false` when the key already held a value.
    async fn set_if_absent(&self, key: &str, value: &Value) -> KeyStoreResult<bool>;
    async fn exists(&self, key: &str) -> KeyStoreResult<bool>;
    async fn delete(&self, key: &str) -> KeyStoreResult<()>;
    async fn ping(&self) -> KeyStoreResult<String>;

    async fn health(&self) -> KeyStoreHealth {
        match self.ping().await {
            Ok(ping) => KeyStoreHealth::Healthy { ping },
            Err(err) => KeyStoreHealth::Unhealthy {
                error: err.to_string(),
            },
        }
    }
}

/// Append-only stream with at-least-once semantics.
#[async_trait]
pub trait DurableStream: Send + Sync {
    /// Appends `{payload}` to `stream` and returns the entry id assigned by the backend.
    async fn publish(&self, stream: &str, payload: &str) -> KeyStoreResult<String>;
}

pub(crate) fn encode_value(value: &Value) -> String {
    value.to_string()
}

pub(crate) fn decode_value(key: &str, raw: &str) -> KeyStoreResult<Value> {
    serde_json::from_str(raw).map_err(|source| KeyStoreError::Decode {
        key: key.to_string(),
        source,
    })
}

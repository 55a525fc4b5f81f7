use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{DurableStream, KeyStore, KeyStoreError, KeyStoreResult};

struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Process-local key store for tests and single-node development.
///
/// `set_offline(true)` makes every command fail with `Unavailable`, which is how the
/// fail-closed authorization paths are exercised.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: DashMap<String, Slot>,
    streams: Mutex<Vec<(String, String)>>,
    sequence: AtomicU64,
    offline: AtomicBool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Entries appended through `DurableStream::publish`, as `(stream, payload)`.
    pub fn published(&self) -> Vec<(String, String)> {
        self.streams
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn online(&self) -> KeyStoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(KeyStoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, key: &str) -> KeyStoreResult<Option<Value>> {
        self.online()?;
        Ok(self
            .entries
            .get(key)
            .filter(|slot| slot.live())
            .map(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> KeyStoreResult<()> {
        self.online()?;
        self.entries.insert(
            key.to_string(),
            Slot {
                value: value.clone(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &Value) -> KeyStoreResult<bool> {
        self.online()?;
        let slot = Slot {
            value: value.clone(),
            expires_at: None,
        };
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().live() {
                    Ok(false)
                } else {
                    occupied.insert(slot);
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str) -> KeyStoreResult<bool> {
        self.online()?;
        Ok(self.entries.get(key).map_or(false, |slot| slot.live()))
    }

    async fn delete(&self, key: &str) -> KeyStoreResult<()> {
        self.online()?;
        self.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> KeyStoreResult<String> {
        self.online()?;
        Ok("PONG".to_string())
    }
}

#[async_trait]
impl DurableStream for MemoryKeyStore {
    async fn publish(&self, stream: &str, payload: &str) -> KeyStoreResult<String> {
        self.online()?;
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let mut entries = self
            .streams
            .lock()
            .map_err(|_| KeyStoreError::Unavailable("stream lock poisoned".to_string()))?;
        entries.push((stream.to_string(), payload.to_string()));
        Ok(format!("{}-{seq}", chrono::Utc::now().timestamp_millis()))
    }
}

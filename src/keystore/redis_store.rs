use ::redis::aio::MultiplexedConnection;
use ::redis::{Client, Cmd, FromRedisValue, RedisError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{
    decode_value, encode_value, DurableStream, KeyStore, KeyStoreError, KeyStoreResult,
};

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

/// Redis/KeyDB client with an explicit open/close lifecycle.
pub struct RedisKeyStore {
    connection: RwLock<Option<MultiplexedConnection>>,
    command_timeout: Duration,
}

impl RedisKeyStore {
    pub async fn open(url: &str) -> KeyStoreResult<Self> {
        Self::open_with_timeout(url, DEFAULT_COMMAND_TIMEOUT).await
    }

    pub async fn open_with_timeout(url: &str, command_timeout: Duration) -> KeyStoreResult<Self> {
        let client = Client::open(url).map_err(|err| KeyStoreError::Unavailable(err.to_string()))?;
        let connection = tokio::time::timeout(command_timeout, client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| KeyStoreError::Unavailable("connect timed out".to_string()))?
            .map_err(|err| KeyStoreError::Unavailable(err.to_string()))?;
        tracing::info!("key store connected");
        Ok(Self {
            connection: RwLock::new(Some(connection)),
            command_timeout,
        })
    }

    /// Sends QUIT and drops the connection. Later commands fail with `Closed`.
    pub async fn close(&self) {
        let connection = self.connection.write().await.take();
        if let Some(mut connection) = connection {
            let quit = ::redis::cmd("QUIT");
            match quit.query_async::<_, ()>(&mut connection).await {
                Ok(()) => tracing::info!("key store connection closed"),
                Err(err) => tracing::warn!(error = %err, "failed to close key store connection"),
            }
        }
    }

    async fn run<T: FromRedisValue>(&self, command: &'static str, cmd: Cmd) -> KeyStoreResult<T> {
        let mut connection = self
            .connection
            .read()
            .await
            .clone()
            .ok_or(KeyStoreError::Closed)?;
        match tokio::time::timeout(self.command_timeout, cmd.query_async::<_, T>(&mut connection)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(classify(command, err)),
            Err(_) => Err(KeyStoreError::Unavailable(format!("{command} timed out"))),
        }
    }
}

fn classify(command: &'static str, err: RedisError) -> KeyStoreError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        tracing::warn!(command, error = %err, "key store unreachable");
        KeyStoreError::Unavailable(err.to_string())
    } else {
        tracing::warn!(command, error = %err, "key store command failed");
        KeyStoreError::Command {
            command,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    async fn get(&self, key: &str) -> KeyStoreResult<Option<Value>> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(key);
        let raw: Option<String> = self.run("GET", cmd).await?;
        raw.map(|raw| decode_value(key, &raw)).transpose()
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> KeyStoreResult<()> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(encode_value(value));
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        self.run::<()>("SET", cmd).await
    }

    async fn set_if_absent(&self, key: &str, value: &Value) -> KeyStoreResult<bool> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(encode_value(value)).arg("NX");
        let reply: Option<String> = self.run("SET", cmd).await?;
        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> KeyStoreResult<bool> {
        let mut cmd = ::redis::cmd("EXISTS");
        cmd.arg(key);
        let count: i64 = self.run("EXISTS", cmd).await?;
        Ok(count == 1)
    }

    async fn delete(&self, key: &str) -> KeyStoreResult<()> {
        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(key);
        self.run::<i64>("DEL", cmd).await.map(|_| ())
    }

    async fn ping(&self) -> KeyStoreResult<String> {
        self.run("PING", ::redis::cmd("PING")).await
    }
}

#[async_trait]
impl DurableStream for RedisKeyStore {
    async fn publish(&self, stream: &str, payload: &str) -> KeyStoreResult<String> {
        let mut cmd = ::redis::cmd("XADD");
        cmd.arg(stream).arg("*").arg("payload").arg(payload);
        self.run("XADD", cmd).await
    }
}

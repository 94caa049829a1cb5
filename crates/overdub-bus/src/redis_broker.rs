//! Redis driver for the durable broker adapter.
//!
//! One shared [`ConnectionManager`] handles the command traffic for the
//! whole process; each subscription gets its own dedicated pub/sub
//! connection (Redis requires that), drained by a forwarding task that is
//! aborted when the [`Subscription`] is dropped.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{info, warn};

use overdub_core::defaults;

use crate::broker::{Broker, BrokerMessage, Subscription};
use crate::error::BrokerError;

impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            BrokerError::Connection(e.to_string())
        } else {
            BrokerError::Command(e.to_string())
        }
    }
}

/// Broker adapter over a Redis instance.
#[derive(Clone)]
pub struct RedisBroker {
    client: redis::Client,
    manager: ConnectionManager,
}

impl RedisBroker {
    /// Connect to the given Redis URL. The returned handle is cheap to
    /// clone and is shared for the process lifetime.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        info!("connected to broker");
        Ok(Self { client, manager })
    }

    /// Connect using `REDIS_URL` (default: `redis://localhost:6379`).
    pub async fn from_env() -> Result<Self, BrokerError> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::connect(&url).await
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn ping(&self) -> Result<(), BrokerError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn append_and_publish(
        &self,
        key: &str,
        channel: &str,
        payload: &str,
        cap: usize,
        ttl: Duration,
    ) -> Result<(), BrokerError> {
        let mut conn = self.manager.clone();
        redis::pipe()
            .atomic()
            .lpush(key, payload)
            .ignore()
            .ltrim(key, 0, cap as isize - 1)
            .ignore()
            .expire(key, ttl.as_secs() as i64)
            .ignore()
            .publish(channel, payload)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, BrokerError> {
        let mut conn = self.manager.clone();
        Ok(conn.lrange::<_, Vec<String>>(key, 0, -1).await?)
    }

    async fn list_remove(&self, key: &str, payload: &str) -> Result<usize, BrokerError> {
        let mut conn = self.manager.clone();
        Ok(conn.lrem::<_, _, usize>(key, 1, payload).await?)
    }

    async fn list_position(
        &self,
        key: &str,
        payload: &str,
    ) -> Result<Option<usize>, BrokerError> {
        let mut conn = self.manager.clone();
        Ok(conn
            .lpos::<_, _, Option<usize>>(key, payload, redis::LposOptions::default())
            .await?)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), BrokerError> {
        let mut conn = self.manager.clone();
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, BrokerError> {
        let mut conn = self.manager.clone();
        let entries = conn.hgetall::<_, HashMap<String, String>>(key).await?;
        Ok(entries.into_iter().collect())
    }

    async fn hash_del(&self, key: &str, field: &str) -> Result<(), BrokerError> {
        let mut conn = self.manager.clone();
        conn.hdel::<_, _, ()>(key, field).await?;
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), BrokerError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> Result<Subscription, BrokerError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(*channel).await?;
        }

        let (tx, rx) = mpsc::channel(defaults::SUBSCRIPTION_BUFFER);
        let forwarder = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let channel = msg.get_channel_name().to_string();
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "non-text pub/sub payload dropped");
                        continue;
                    }
                };
                if tx.send(BrokerMessage { channel, payload }).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, forwarder))
    }
}

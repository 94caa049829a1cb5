//! In-memory driver for the durable broker adapter.
//!
//! Single-process stand-in with the same observable semantics as the
//! Redis driver: capped newest-first lists with whole-key TTLs (expired
//! lazily on access, against `tokio::time::Instant` so paused-time tests
//! can drive expiry), hashes, and a broadcast-backed pub/sub fan-out.
//! Used by the test suite and for broker-less local development.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::Instant;
use tracing::warn;

use overdub_core::defaults;

use crate::broker::{Broker, BrokerMessage, Subscription};
use crate::error::BrokerError;

const PUBLISH_BUFFER: usize = 256;

#[derive(Default)]
struct ExpiringList {
    entries: VecDeque<String>,
    expires_at: Option<Instant>,
}

impl ExpiringList {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[derive(Default)]
struct MemoryState {
    lists: HashMap<String, ExpiringList>,
    hashes: HashMap<String, HashMap<String, String>>,
}

impl MemoryState {
    /// Drop the list at `key` if its TTL has passed, then return it.
    fn live_list(&mut self, key: &str) -> Option<&mut ExpiringList> {
        if self.lists.get(key).is_some_and(ExpiringList::is_expired) {
            self.lists.remove(key);
        }
        self.lists.get_mut(key)
    }
}

/// In-memory broker sharing one pub/sub space per instance.
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<MemoryState>>,
    publish_tx: broadcast::Sender<BrokerMessage>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (publish_tx, _) = broadcast::channel(PUBLISH_BUFFER);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            publish_tx,
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn ping(&self) -> Result<(), BrokerError> {
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
        {
            let mut state = self.state.lock().await;
            // Take over an expired slot instead of appending to stale data.
            if state.lists.get(key).is_some_and(ExpiringList::is_expired) {
                state.lists.remove(key);
            }
            let list = state.lists.entry(key.to_string()).or_default();
            list.entries.push_front(payload.to_string());
            list.entries.truncate(cap);
            list.expires_at = Some(Instant::now() + ttl);
        }
        // No subscribers is fine.
        let _ = self.publish_tx.send(BrokerMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, BrokerError> {
        let mut state = self.state.lock().await;
        Ok(state
            .live_list(key)
            .map(|list| list.entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_remove(&self, key: &str, payload: &str) -> Result<usize, BrokerError> {
        let mut state = self.state.lock().await;
        let Some(list) = state.live_list(key) else {
            return Ok(0);
        };
        match list.entries.iter().position(|entry| entry == payload) {
            Some(index) => {
                list.entries.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_position(
        &self,
        key: &str,
        payload: &str,
    ) -> Result<Option<usize>, BrokerError> {
        let mut state = self.state.lock().await;
        Ok(state
            .live_list(key)
            .and_then(|list| list.entries.iter().position(|entry| entry == payload)))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, BrokerError> {
        let state = self.state.lock().await;
        Ok(state
            .hashes
            .get(key)
            .map(|hash| {
                hash.iter()
                    .map(|(field, value)| (field.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn hash_del(&self, key: &str, field: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        if let Some(hash) = state.hashes.get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.lists.remove(key);
        state.hashes.remove(key);
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> Result<Subscription, BrokerError> {
        let mut publish_rx = self.publish_tx.subscribe();
        let channels: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        let (tx, rx) = mpsc::channel(defaults::SUBSCRIPTION_BUFFER);

        let forwarder = tokio::spawn(async move {
            loop {
                match publish_rx.recv().await {
                    Ok(msg) => {
                        if !channels.iter().any(|c| c == &msg.channel) {
                            continue;
                        }
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "in-memory subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx, forwarder))
    }
}

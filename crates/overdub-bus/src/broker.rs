//! Durable broker adapter: the narrow interface the event bus depends on.
//!
//! The broker is a shared key/value + pub/sub store. This trait owns the
//! low-level primitives (list push/trim/expire, hash get/set, pub/sub)
//! and nothing else: no retries, no business semantics. Transient errors
//! surface as [`BrokerError`] and are handled by the layer above.
//!
//! Two drivers implement it: [`crate::RedisBroker`] for production and
//! [`crate::MemoryBroker`] for tests and broker-less development.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::BrokerError;

/// A message received from a pub/sub subscription.
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    /// Channel the message was published on.
    pub channel: String,
    /// Raw serialized payload.
    pub payload: String,
}

/// Handle to an active pub/sub subscription.
///
/// Messages are forwarded from the broker connection by a background task.
/// Dropping the subscription aborts the forwarder and releases the
/// broker-side resources; no explicit unsubscribe call is needed.
pub struct Subscription {
    rx: mpsc::Receiver<BrokerMessage>,
    forwarder: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<BrokerMessage>, forwarder: JoinHandle<()>) -> Self {
        Self { rx, forwarder }
    }

    /// Receive the next message. Returns `None` once the subscription has
    /// ended (broker connection lost or subscription dropped).
    pub async fn next(&mut self) -> Option<BrokerMessage> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Low-level primitives over the shared durable store.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Connectivity probe. Unlike the best-effort paths, failures here
    /// propagate to the caller (startup check semantics).
    async fn ping(&self) -> Result<(), BrokerError>;

    /// The single atomic transaction behind `post`/`broadcast`: push
    /// `payload` to the front of the list at `key`, trim the list to
    /// `cap` entries, refresh the whole-key TTL, and publish the payload
    /// on `channel`.
    async fn append_and_publish(
        &self,
        key: &str,
        channel: &str,
        payload: &str,
        cap: usize,
        ttl: Duration,
    ) -> Result<(), BrokerError>;

    /// Full list snapshot in stored order (newest first).
    async fn list_range(&self, key: &str) -> Result<Vec<String>, BrokerError>;

    /// Remove the first occurrence of `payload` from the list at `key`.
    /// Removing from a missing key or a missing value is a no-op
    /// returning 0, never an error.
    async fn list_remove(&self, key: &str, payload: &str) -> Result<usize, BrokerError>;

    /// Position of `payload` in the list at `key`, if present.
    async fn list_position(&self, key: &str, payload: &str)
        -> Result<Option<usize>, BrokerError>;

    /// Set a field in the hash at `key`, overwriting any existing value.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), BrokerError>;

    /// All field/value pairs of the hash at `key`.
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, BrokerError>;

    /// Delete a field from the hash at `key`.
    async fn hash_del(&self, key: &str, field: &str) -> Result<(), BrokerError>;

    /// Delete an entire key.
    async fn delete_key(&self, key: &str) -> Result<(), BrokerError>;

    /// Subscribe to the given channels. The subscription is established
    /// before this returns, so messages published afterwards are never
    /// missed.
    async fn subscribe(&self, channels: &[&str]) -> Result<Subscription, BrokerError>;
}

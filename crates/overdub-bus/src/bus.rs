//! Per-recipient event bus with replay-then-live-tail delivery.
//!
//! Every recipient (session) has a bounded, TTL'd event log and a private
//! pub/sub channel on the broker; a global broadcast log/channel reaches
//! every listener. [`EventBus::post`] persists and publishes in one broker
//! transaction; [`EventBus::listen`] replays the stored backlog and then
//! tails live messages until the stream is dropped or the exit sentinel
//! arrives on the private channel.
//!
//! Delivery is at-least-once: a message racing the subscribe call can show
//! up in both the backlog and the live tail. Subscribing before the
//! backlog read guarantees nothing is lost in between.
//!
//! Expiry uses two mechanisms, as the production layout does: the
//! whole-log TTL (authoritative) and a deferred per-entry removal after
//! the same lifetime (redundant; removing an already-expired entry is a
//! no-op). Deferred work runs in a supervised task set drained at
//! process teardown by [`EventBus::close_all_connections`].

use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use serde_json::{json, Map, Value};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use overdub_core::{BusConfig, Event, SseMessage};

use crate::broker::Broker;
use crate::error::BrokerError;

/// Hash directory of live connection metadata, one field per recipient.
const CONNECTIONS_KEY: &str = "sse:active_connections";
/// Channel every listener subscribes to in addition to its private one.
const BROADCAST_CHANNEL: &str = "broadcast:all";
/// Shared broadcast event log.
const BROADCAST_KEY: &str = "broadcast:messages";

fn log_key(recipient_id: &str) -> String {
    format!("event:{recipient_id}")
}

fn private_channel(recipient_id: &str) -> String {
    format!("user:{recipient_id}")
}

struct BusInner {
    broker: Arc<dyn Broker>,
    config: BusConfig,
    /// Deferred deletions (connection records, per-entry log removals).
    /// Aborted and drained by `close_all_connections`.
    tasks: tokio::sync::Mutex<JoinSet<()>>,
}

/// Cheap-to-clone handle to the event bus. Construct one per process and
/// inject it wherever events are produced or consumed.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(broker: Arc<dyn Broker>, config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                broker,
                config,
                tasks: tokio::sync::Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// The broker this bus was constructed with.
    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.inner.broker
    }

    /// Connectivity probe. Propagates broker errors (startup check).
    pub async fn check_connection(&self) -> Result<(), BrokerError> {
        self.inner.broker.ping().await
    }

    /// Upsert the connection record for a recipient. Idempotent: a second
    /// call overwrites the stored metadata.
    pub async fn add_connection(&self, recipient_id: &str, metadata: Map<String, Value>) {
        let serialized = Value::Object(metadata).to_string();
        if let Err(e) = self
            .inner
            .broker
            .hash_set(CONNECTIONS_KEY, recipient_id, &serialized)
            .await
        {
            error!(session_id = %recipient_id, error = %e, "failed to add connection record");
        }
    }

    /// Schedule deletion of the connection record. The deletion happens
    /// after this call returns, in a supervised background task, so it
    /// cannot race a `listen` loop mid-replay during reconnect churn.
    pub async fn remove_connection(&self, recipient_id: &str) {
        let broker = self.inner.broker.clone();
        let recipient = recipient_id.to_string();
        self.spawn_background(async move {
            info!(session_id = %recipient, "connection record will be removed");
            match broker.hash_del(CONNECTIONS_KEY, &recipient).await {
                Ok(()) => info!(session_id = %recipient, "connection record removed"),
                Err(e) => {
                    error!(session_id = %recipient, error = %e, "failed to remove connection record")
                }
            }
        })
        .await;
    }

    /// Snapshot of the live-connection directory. Best-effort: entries
    /// that fail to parse degrade to `{"value": <raw>}`, and a broker
    /// failure yields an empty map; neither aborts the read.
    pub async fn get_active_connections(&self) -> HashMap<String, Value> {
        let entries = match self.inner.broker.hash_get_all(CONNECTIONS_KEY).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "failed to read active connections");
                return HashMap::new();
            }
        };

        entries
            .into_iter()
            .map(|(recipient_id, raw)| {
                let value = match serde_json::from_str::<Value>(&raw) {
                    Ok(parsed) if parsed.is_object() => parsed,
                    Ok(parsed) => json!({ "value": parsed }),
                    Err(_) => json!({ "value": raw }),
                };
                (recipient_id, value)
            })
            .collect()
    }

    /// Persist and publish an event for one recipient: push-front onto the
    /// recipient's log, trim to the cap, refresh the log TTL, publish on
    /// the private channel — one broker transaction — then schedule the
    /// deferred removal of exactly this entry after `message_lifetime`.
    ///
    /// Best-effort: broker failures are logged and absorbed; delivery
    /// degrades to a missed notification, never a failed request.
    pub async fn post(&self, recipient_id: &str, event: &Event) {
        let key = log_key(recipient_id);
        let channel = private_channel(recipient_id);
        if let Err(e) = self.append(&key, &channel, event).await {
            error!(session_id = %recipient_id, error = %e, "post failed");
        }
    }

    /// Same shape as [`post`](Self::post), against the shared broadcast
    /// log and channel. Every active listener receives it.
    pub async fn broadcast(&self, event: &Event) {
        match self.append(BROADCAST_KEY, BROADCAST_CHANNEL, event).await {
            Ok(()) => info!(event = %event.name, "broadcast message sent"),
            Err(e) => error!(error = %e, "broadcast failed"),
        }
    }

    async fn append(&self, key: &str, channel: &str, event: &Event) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(event)?;
        let config = &self.inner.config;
        self.inner
            .broker
            .append_and_publish(
                key,
                channel,
                &payload,
                config.max_events_per_user,
                config.message_lifetime,
            )
            .await?;
        debug!(key = %key, channel = %channel, event = %event.name, "event appended");

        // Redundant with the whole-key TTL; removal of an entry that
        // already expired (or whose key was recreated) is a no-op.
        let broker = self.inner.broker.clone();
        let lifetime = config.message_lifetime;
        let key = key.to_string();
        self.spawn_background(async move {
            tokio::time::sleep(lifetime).await;
            match broker.list_remove(&key, &payload).await {
                Ok(removed) => debug!(key = %key, removed, "deferred event removal"),
                Err(e) => warn!(key = %key, error = %e, "deferred event removal failed"),
            }
        })
        .await;
        Ok(())
    }

    /// Post the exit sentinel to a recipient, closing its active listen
    /// stream from the server side.
    pub async fn shutdown(&self, recipient_id: &str) {
        self.post(recipient_id, &Event::exit(recipient_id)).await;
    }

    /// Process-wide teardown: shut down every known recipient, clear the
    /// connection directory, then abort and drain the deferred task set so
    /// nothing outlives the process.
    pub async fn close_all_connections(&self) {
        info!("closing all connections");
        for recipient_id in self.get_active_connections().await.keys() {
            self.shutdown(recipient_id).await;
        }
        if let Err(e) = self.inner.broker.delete_key(CONNECTIONS_KEY).await {
            error!(error = %e, "failed to clear connection directory");
        }

        let mut tasks = self.inner.tasks.lock().await;
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }

    /// One subscriber lifetime for one recipient.
    ///
    /// The stream subscribes to the private and broadcast channels first,
    /// then replays the stored backlog oldest-to-newest, then tails live
    /// messages. Broadcast deliveries are tagged `info.broadcast = true`.
    /// The exit sentinel closes the stream only when it arrives on the
    /// private channel. Dropping the stream at any point (client
    /// disconnect) releases the subscription and schedules the deferred
    /// connection-record removal; broker errors while live end the stream
    /// cleanly instead of propagating.
    pub fn listen(&self, recipient_id: &str) -> impl Stream<Item = SseMessage> + Send + 'static {
        let bus = self.clone();
        let recipient = recipient_id.to_string();

        async_stream::stream! {
            let private = private_channel(&recipient);
            // Subscribe before reading the backlog so messages published
            // in between are not lost (they may instead arrive twice).
            let mut sub = match bus.inner.broker.subscribe(&[private.as_str(), BROADCAST_CHANNEL]).await {
                Ok(sub) => sub,
                Err(e) => {
                    error!(session_id = %recipient, error = %e, "listen subscribe failed");
                    return;
                }
            };
            info!(session_id = %recipient, "listening for events");
            let _closing = ClosingGuard {
                bus: bus.clone(),
                recipient: recipient.clone(),
            };

            let backlog = match bus.inner.broker.list_range(&log_key(&recipient)).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(session_id = %recipient, error = %e, "backlog read failed, skipping replay");
                    Vec::new()
                }
            };
            // Stored newest-first; deliver oldest-to-newest.
            for raw in backlog.iter().rev() {
                match serde_json::from_str::<Event>(raw) {
                    Ok(event) => yield event.to_sse(),
                    Err(e) => {
                        warn!(session_id = %recipient, error = %e, "undecodable stored event");
                        yield Event::undeliverable(&recipient).to_sse();
                    }
                }
            }

            while let Some(msg) = sub.next().await {
                let mut event: Event = match serde_json::from_str(&msg.payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(channel = %msg.channel, error = %e, "undecodable live event");
                        continue;
                    }
                };
                let from_broadcast = msg.channel == BROADCAST_CHANNEL;
                if from_broadcast {
                    event.data.mark_broadcast();
                }
                if event.is_exit() && !from_broadcast {
                    break;
                }
                yield event.to_sse();
            }
            // Dropping `sub` releases the broker subscription; the guard
            // schedules the deferred connection-record removal.
        }
    }

    /// Spawn a deferred task into the supervised set, reaping any that
    /// have already finished.
    async fn spawn_background(&self, task: impl std::future::Future<Output = ()> + Send + 'static) {
        let mut tasks = self.inner.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }
}

/// Runs the CLOSING step when a listen stream ends for any reason —
/// sentinel, broker failure, or the consumer dropping the stream.
struct ClosingGuard {
    bus: EventBus,
    recipient: String,
}

impl Drop for ClosingGuard {
    fn drop(&mut self) {
        info!(session_id = %self.recipient, "listener closed");
        let bus = self.bus.clone();
        let recipient = std::mem::take(&mut self.recipient);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                bus.remove_connection(&recipient).await;
            });
        }
    }
}

//! Live connection registry for socket-style transports.
//!
//! A pure last-writer-wins directory, not a message buffer: each recipient
//! has at most one registered transport handle. Registering a second
//! handle force-closes the first. The registry map is locked across the
//! close-then-register sequence so two racing connects for one recipient
//! can never leave two live handles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use overdub_core::SseMessage;

use crate::error::RegistryError;

/// A long-lived client connection that can receive pushed frames.
#[async_trait]
pub trait LiveTransport: Send + Sync + 'static {
    /// Write one frame to the client.
    async fn send(&self, message: &SseMessage) -> Result<(), RegistryError>;

    /// Close the underlying connection. Must be safe to call once on a
    /// handle that is about to be discarded.
    async fn close(&self);
}

/// Directory of live transport handles, one per recipient.
pub struct LiveRegistry<T> {
    connections: Mutex<HashMap<String, Arc<T>>>,
}

impl<T: LiveTransport> LiveRegistry<T> {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Register a transport for a recipient. Any previously registered
    /// handle is force-closed before the new one replaces it.
    pub async fn connect(&self, recipient_id: &str, transport: Arc<T>) {
        let mut connections = self.connections.lock().await;
        if let Some(previous) = connections.remove(recipient_id) {
            info!(session_id = %recipient_id, "replacing existing live connection");
            previous.close().await;
        }
        connections.insert(recipient_id.to_string(), transport);
        info!(session_id = %recipient_id, "live connection registered");
    }

    /// Remove a recipient's record. A missing record is a caller bug and
    /// surfaces as [`RegistryError::NotConnected`], never a silent no-op.
    pub async fn disconnect(&self, recipient_id: &str) -> Result<(), RegistryError> {
        match self.connections.lock().await.remove(recipient_id) {
            Some(_) => {
                info!(session_id = %recipient_id, "live connection removed");
                Ok(())
            }
            None => Err(RegistryError::NotConnected(recipient_id.to_string())),
        }
    }

    /// The registered handle for a recipient, if any.
    pub async fn get(&self, recipient_id: &str) -> Option<Arc<T>> {
        self.connections.lock().await.get(recipient_id).cloned()
    }

    /// Number of registered connections.
    pub async fn active_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Single best-effort write to one handle; failures are logged, not
    /// returned.
    pub async fn send(transport: &T, message: &SseMessage) {
        if let Err(e) = transport.send(message).await {
            warn!(error = %e, "live send failed");
        }
    }

    /// Best-effort write to every registered handle, continuing past
    /// individual failures. Writes go to a snapshot of the directory so
    /// the lock is not held across transport I/O.
    pub async fn broadcast_all(&self, message: &SseMessage) {
        let snapshot: Vec<(String, Arc<T>)> = self
            .connections
            .lock()
            .await
            .iter()
            .map(|(id, transport)| (id.clone(), transport.clone()))
            .collect();

        for (recipient_id, transport) in snapshot {
            if let Err(e) = transport.send(message).await {
                warn!(session_id = %recipient_id, error = %e, "broadcast write failed");
            }
        }
    }
}

impl<T: LiveTransport> Default for LiveRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Error types for the event bus and live registry.

use thiserror::Error;

/// Errors surfaced by the durable broker adapter.
///
/// Best-effort paths (`post`, `broadcast`, deferred cleanups, connection
/// directory writes) catch and log these at the bus boundary; the startup
/// `ping` probe propagates them.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Broker unreachable or connection dropped.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// Broker reachable but the command failed.
    #[error("broker command failed: {0}")]
    Command(String),

    /// A stored payload no longer parses.
    #[error("payload failed to decode: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Errors surfaced by the live connection registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Disconnect called for a recipient with no registered connection.
    /// A double-disconnect is a caller bug, surfaced rather than absorbed.
    #[error("no live connection registered for session {0}")]
    NotConnected(String),

    /// A transport write failed.
    #[error("transport write failed: {0}")]
    Transport(String),
}

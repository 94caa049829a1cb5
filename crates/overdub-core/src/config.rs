//! Configuration for the event bus and the upload coordinator.
//!
//! Config structs are built once at startup (constructor-injected into the
//! components that need them) and are immutable afterwards.

use std::time::Duration;

use crate::defaults;

/// Configuration for the per-recipient event bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Log cap: events retained per recipient before the oldest are trimmed.
    pub max_events_per_user: usize,
    /// Event lifetime: whole-log TTL and deferred per-entry removal delay.
    pub message_lifetime: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_events_per_user: defaults::MAX_EVENTS_PER_USER,
            message_lifetime: Duration::from_secs(defaults::MESSAGE_LIFETIME_SECS),
        }
    }
}

impl BusConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `EVENTBUS_MAX_EVENTS` | `100` | Per-recipient log cap |
    /// | `EVENTBUS_MESSAGE_LIFETIME_SECS` | `3600` | Event lifetime in seconds |
    pub fn from_env() -> Self {
        let max_events_per_user = std::env::var("EVENTBUS_MAX_EVENTS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::MAX_EVENTS_PER_USER)
            .max(1);

        let lifetime_secs = std::env::var("EVENTBUS_MESSAGE_LIFETIME_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::MESSAGE_LIFETIME_SECS)
            .max(1);

        Self {
            max_events_per_user,
            message_lifetime: Duration::from_secs(lifetime_secs),
        }
    }

    /// Set the per-recipient log cap.
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events_per_user = max.max(1);
        self
    }

    /// Set the event lifetime.
    pub fn with_message_lifetime(mut self, lifetime: Duration) -> Self {
        self.message_lifetime = lifetime;
        self
    }
}

/// Configuration for the multipart upload coordinator.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Fixed chunk size in bytes. Every part except the last is exactly
    /// this large; object stores reject undersized non-final parts, so
    /// keep this at or above the store's minimum (5 MiB for S3).
    pub chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::UPLOAD_CHUNK_SIZE,
        }
    }
}

impl UploadConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `UPLOAD_CHUNK_SIZE_BYTES` | `5242880` | Multipart chunk size |
    pub fn from_env() -> Self {
        let chunk_size = std::env::var("UPLOAD_CHUNK_SIZE_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::UPLOAD_CHUNK_SIZE)
            .max(1);

        Self { chunk_size }
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }
}

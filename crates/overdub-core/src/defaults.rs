//! Default constants shared across the overdub crates.
//!
//! Values chosen to match the production service configuration; override
//! via the config structs in [`crate::config`].

/// Maximum events retained per recipient log before the oldest are trimmed.
pub const MAX_EVENTS_PER_USER: usize = 100;

/// Lifetime of a stored event in seconds. Both the whole-log TTL and the
/// deferred per-entry removal use this value.
pub const MESSAGE_LIFETIME_SECS: u64 = 3600;

/// Fixed chunk size for multipart uploads (5 MiB). Object stores require
/// every part except the last to be at least this large.
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Buffer capacity for broker subscription forwarding channels.
pub const SUBSCRIPTION_BUFFER: usize = 64;

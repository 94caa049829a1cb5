//! Structured logging field name constants.
//!
//! All overdub crates log through `tracing` with these field names so log
//! aggregation can query consistently across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Broker/store unreachable, commit failures |
//! | WARN  | Degraded entry (bad payload), absorbed transient error |
//! | INFO  | Lifecycle: listener open/close, upload begin/commit/abort |
//! | DEBUG | Per-operation detail (posts, trims, part uploads) |

/// Subsystem originating the log event.
/// Values: "bus", "broker", "registry", "upload"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "post", "broadcast", "listen", "upload_part"
pub const OPERATION: &str = "op";

/// Recipient (session) identifier an event or connection belongs to.
pub const SESSION_ID: &str = "session_id";

/// Pub/sub channel a message arrived on.
pub const CHANNEL: &str = "channel";

/// Object store bucket being written.
pub const BUCKET: &str = "bucket";

/// Object key being written.
pub const OBJECT_KEY: &str = "object_key";

/// Multipart upload identifier.
pub const UPLOAD_ID: &str = "upload_id";

/// Number of chunks processed so far.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Bytes transferred so far.
pub const BYTES: &str = "bytes";

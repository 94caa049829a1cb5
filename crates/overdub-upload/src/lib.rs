//! # overdub-upload
//!
//! Streams large file bodies to a remote object store in fixed-size
//! chunks via the store's multipart-upload protocol, without buffering
//! whole files in memory. An upload either commits with every uploaded
//! part referenced or aborts and leaves nothing visible at the
//! destination key.
//!
//! The coordinator is deliberately decoupled from the notification
//! subsystem: callers observe chunk completions through a callback and
//! emit their own progress events.

pub mod chunker;
pub mod error;
pub mod multipart;
pub mod progress;
pub mod store;

pub use chunker::chunks;
pub use error::UploadError;
pub use multipart::{upload_stream, MultipartUpload};
pub use progress::ProgressTracker;
pub use store::{CompletedPart, ObjectStore};

//! # overdub-core
//!
//! Core types and conventions shared by the overdub crates: the notification
//! event schema and its wire format, configuration structs, default
//! constants, and structured-logging field names.

pub mod config;
pub mod defaults;
pub mod events;
pub mod logging;

// Re-export commonly used types at crate root
pub use config::{BusConfig, UploadConfig};
pub use events::{Event, EventData, NotificationType, Position, SseMessage, EXIT_EVENT};

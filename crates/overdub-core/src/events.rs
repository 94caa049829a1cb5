//! Notification event schema and wire format.
//!
//! Every push notification delivered to a client — progress updates,
//! worker completion notices, broadcasts — is an [`Event`]: a name plus an
//! [`EventData`] payload. Events are immutable value types, serialized to
//! JSON once at post time and stored/published verbatim. The single
//! sanctioned mutation is the broadcast provenance tag
//! ([`EventData::mark_broadcast`]), applied by the consuming bus instance,
//! never by producers.
//!
//! The wire casing (`"CRITICAL"`, `"left-top"`, …) is part of the client
//! contract and must not change with Rust naming conventions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known sentinel event name. Posting an event with this name to a
/// recipient's private channel tells that recipient's `listen` loop to
/// close itself. Ignored when it arrives via broadcast.
pub const EXIT_EVENT: &str = "__exit__";

/// Severity of a client-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Critical,
    Warning,
    Info,
    Success,
}

impl Default for NotificationType {
    fn default() -> Self {
        NotificationType::Success
    }
}

/// Screen position hint for toast-style rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    LeftTop,
    LeftBottom,
    RightTop,
    RightBottom,
    Center,
}

impl Default for Position {
    fn default() -> Self {
        Position::RightBottom
    }
}

/// Payload of a notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Recipient (session) identifier the event is addressed to.
    pub id: String,
    /// Human-readable message text.
    pub message: String,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub position: Position,
    /// Free-form extras. Omitted from the wire when absent. The bus sets
    /// `info.broadcast = true` on events delivered via the broadcast
    /// channel; producers leave this field alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Map<String, Value>>,
}

impl EventData {
    /// Tag this payload as having arrived via the broadcast channel.
    pub fn mark_broadcast(&mut self) {
        self.info
            .get_or_insert_with(Map::new)
            .insert("broadcast".to_string(), Value::Bool(true));
    }

    /// Whether the broadcast provenance tag is set.
    pub fn is_broadcast(&self) -> bool {
        self.info
            .as_ref()
            .and_then(|m| m.get("broadcast"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A named notification event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub data: EventData,
}

impl Event {
    /// Build an event with explicit severity and position.
    pub fn new(
        name: impl Into<String>,
        recipient_id: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
        position: Position,
    ) -> Self {
        Self {
            name: name.into(),
            data: EventData {
                id: recipient_id.into(),
                message: message.into(),
                notification_type,
                position,
                info: None,
            },
        }
    }

    /// Plain `message` event with default severity/position.
    pub fn message(recipient_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            "message",
            recipient_id,
            message,
            NotificationType::default(),
            Position::default(),
        )
    }

    /// The exit sentinel telling a recipient's listen loop to close.
    pub fn exit(recipient_id: impl Into<String>) -> Self {
        Self::new(
            EXIT_EVENT,
            recipient_id,
            "Server is shutting down. Please reconnect.",
            NotificationType::Warning,
            Position::RightTop,
        )
    }

    /// Placeholder yielded in place of a stored event whose payload no
    /// longer parses. Replay continues past the bad entry.
    pub fn undeliverable(recipient_id: impl Into<String>) -> Self {
        Self::new(
            "message",
            recipient_id,
            "A stored notification could not be decoded.",
            NotificationType::Warning,
            Position::default(),
        )
    }

    /// Whether this is the exit sentinel.
    pub fn is_exit(&self) -> bool {
        self.name == EXIT_EVENT
    }

    /// Render for a server-push transport: the event name plus the
    /// serialized payload, framed downstream as one SSE block or one
    /// socket frame.
    pub fn to_sse(&self) -> SseMessage {
        let data = serde_json::to_string(&self.data).unwrap_or_else(|e| {
            tracing::error!(error = %e, event = %self.name, "event payload failed to serialize");
            String::from("{}")
        });
        SseMessage {
            event: self.name.clone(),
            data,
        }
    }
}

/// A rendered event, ready for transport framing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_casing() {
        assert_eq!(
            serde_json::to_string(&NotificationType::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(
            serde_json::to_string(&Position::LeftTop).unwrap(),
            "\"left-top\""
        );
        assert_eq!(
            serde_json::from_str::<Position>("\"right-bottom\"").unwrap(),
            Position::RightBottom
        );
    }

    #[test]
    fn event_serializes_without_info() {
        let event = Event::message("s1", "hello");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("info"));
        assert!(json.contains("\"right-bottom\""));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let event: Event =
            serde_json::from_str(r#"{"name":"message","data":{"id":"s1","message":"hi"}}"#)
                .unwrap();
        assert_eq!(event.data.notification_type, NotificationType::Success);
        assert_eq!(event.data.position, Position::RightBottom);
        assert!(event.data.info.is_none());
    }

    #[test]
    fn exit_sentinel() {
        let event = Event::exit("s1");
        assert!(event.is_exit());
        assert_eq!(event.name, EXIT_EVENT);
        assert_eq!(event.data.notification_type, NotificationType::Warning);
        assert_eq!(event.data.position, Position::RightTop);
    }

    #[test]
    fn broadcast_tag_roundtrip() {
        let mut event = Event::message("s1", "hi");
        assert!(!event.data.is_broadcast());
        event.data.mark_broadcast();
        assert!(event.data.is_broadcast());

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert!(back.data.is_broadcast());
    }

    #[test]
    fn to_sse_renders_name_and_payload() {
        let msg = Event::message("s1", "42").to_sse();
        assert_eq!(msg.event, "message");
        let data: EventData = serde_json::from_str(&msg.data).unwrap();
        assert_eq!(data.id, "s1");
        assert_eq!(data.message, "42");
    }
}

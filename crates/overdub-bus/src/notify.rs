//! Producer convenience helpers for the common notification shapes.
//!
//! Thin constructors over [`EventBus::post`]/[`EventBus::broadcast`];
//! route handlers and the upload flow call these instead of assembling
//! [`Event`]s by hand.

use overdub_core::{Event, NotificationType, Position};

use crate::bus::EventBus;

/// Plain per-session message with default severity/position.
pub async fn session_message(bus: &EventBus, session_id: &str, message: &str) {
    bus.post(session_id, &Event::message(session_id, message))
        .await;
}

/// Upload progress for one session: a `progress` event carrying
/// `Progress state: N`, rendered centered.
pub async fn upload_progress(bus: &EventBus, session_id: &str, percent: u8) {
    let event = Event::new(
        "progress",
        session_id,
        format!("Progress state: {percent}"),
        NotificationType::Info,
        Position::Center,
    );
    bus.post(session_id, &event).await;
}

/// Mixing progress reported by the worker; same wire shape as upload
/// progress.
pub async fn mixing_progress(bus: &EventBus, session_id: &str, percent: u8) {
    let event = Event::new(
        "progress",
        session_id,
        format!("Progress state: {percent}"),
        NotificationType::Info,
        Position::Center,
    );
    bus.post(session_id, &event).await;
}

/// Success notice once every part of an upload has been committed.
pub async fn upload_complete(bus: &EventBus, session_id: &str) {
    let event = Event::new(
        "progress",
        session_id,
        "Upload has been successfully completed",
        NotificationType::Success,
        Position::Center,
    );
    bus.post(session_id, &event).await;
}

/// Global notice to every connected listener.
pub async fn broadcast_message(bus: &EventBus, message: &str) {
    let event = Event::new(
        "broadcast_message",
        "broadcast",
        message,
        NotificationType::Info,
        Position::RightBottom,
    );
    bus.broadcast(&event).await;
}

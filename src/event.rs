//! `BoardEvent` — the wire messages exchanged on a board channel.
//!
//! DESIGN
//! ======
//! The transport carries an event name plus a JSON payload. The name is the
//! variant tag (`element-created`, `cursor-moved`, ...) and the payload holds
//! the variant's fields in camelCase, always including the originating
//! `userId` and `username` so receivers can drop self-echoes and attribute
//! changes:
//!
//! ```json
//! event:   "element-updated"
//! payload: {"element": {"type": "shape", ...}, "userId": 1, "username": "ala"}
//! ```
//!
//! Internally the enum is serde-tagged on `type`; [`BoardEvent::to_wire`]
//! strips the tag into the event name and [`BoardEvent::decode`] puts it back.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use canvas::DrawingElement;
use serde::{Deserialize, Serialize};

use crate::UserId;

// =============================================================================
// EVENT NAMES
// =============================================================================

pub const ELEMENT_CREATED: &str = "element-created";
pub const ELEMENT_UPDATED: &str = "element-updated";
pub const ELEMENT_DELETED: &str = "element-deleted";
pub const ELEMENTS_BATCH: &str = "elements-batch";
pub const CURSOR_MOVED: &str = "cursor-moved";
pub const TYPING_STARTED: &str = "typing-started";
pub const TYPING_STOPPED: &str = "typing-stopped";
pub const VIEWPORT_CHANGED: &str = "viewport-changed";

/// Every event name a board channel carries.
pub const EVENT_NAMES: [&str; 8] = [
    ELEMENT_CREATED,
    ELEMENT_UPDATED,
    ELEMENT_DELETED,
    ELEMENTS_BATCH,
    CURSOR_MOVED,
    TYPING_STARTED,
    TYPING_STOPPED,
    VIEWPORT_CHANGED,
];

const TAG: &str = "type";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BoardEvent {
    #[serde(rename_all = "camelCase")]
    ElementCreated { element: DrawingElement, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    ElementUpdated { element: DrawingElement, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    ElementDeleted { element_id: String, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    ElementsBatch { elements: Vec<DrawingElement>, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    CursorMoved { x: f64, y: f64, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    TypingStarted { element_id: String, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    TypingStopped { element_id: String, user_id: UserId, username: String },
    #[serde(rename_all = "camelCase")]
    ViewportChanged { x: f64, y: f64, scale: f64, user_id: UserId, username: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("unknown board event: {0}")]
    UnknownEvent(String),
    #[error("{0} payload is not a JSON object")]
    NotAnObject(String),
    #[error("malformed {event} payload: {source}")]
    Malformed { event: String, source: serde_json::Error },
    #[error("failed to encode board event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Grepable error code, logged next to the message.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

impl ErrorCode for EventError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::NotAnObject(_) => "E_PAYLOAD_NOT_OBJECT",
            Self::Malformed { .. } => "E_MALFORMED_PAYLOAD",
            Self::Encode(_) => "E_ENCODE",
        }
    }
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl BoardEvent {
    /// Event name used on the wire.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ElementCreated { .. } => ELEMENT_CREATED,
            Self::ElementUpdated { .. } => ELEMENT_UPDATED,
            Self::ElementDeleted { .. } => ELEMENT_DELETED,
            Self::ElementsBatch { .. } => ELEMENTS_BATCH,
            Self::CursorMoved { .. } => CURSOR_MOVED,
            Self::TypingStarted { .. } => TYPING_STARTED,
            Self::TypingStopped { .. } => TYPING_STOPPED,
            Self::ViewportChanged { .. } => VIEWPORT_CHANGED,
        }
    }

    /// Id of the user whose session emitted the event.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            Self::ElementCreated { user_id, .. }
            | Self::ElementUpdated { user_id, .. }
            | Self::ElementDeleted { user_id, .. }
            | Self::ElementsBatch { user_id, .. }
            | Self::CursorMoved { user_id, .. }
            | Self::TypingStarted { user_id, .. }
            | Self::TypingStopped { user_id, .. }
            | Self::ViewportChanged { user_id, .. } => *user_id,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::ElementCreated { username, .. }
            | Self::ElementUpdated { username, .. }
            | Self::ElementDeleted { username, .. }
            | Self::ElementsBatch { username, .. }
            | Self::CursorMoved { username, .. }
            | Self::TypingStarted { username, .. }
            | Self::TypingStopped { username, .. }
            | Self::ViewportChanged { username, .. } => username,
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

impl BoardEvent {
    /// Split into the event name and the untagged JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Encode`] if an element holds a value JSON cannot
    /// represent.
    pub fn to_wire(&self) -> Result<(&'static str, serde_json::Value), EventError> {
        let mut payload = serde_json::to_value(self)?;
        if let Some(map) = payload.as_object_mut() {
            map.remove(TAG);
        }
        Ok((self.name(), payload))
    }

    /// Rebuild an event from a transport broadcast.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown event names, non-object payloads and
    /// payloads missing or mistyping a field.
    pub fn decode(event: &str, payload: serde_json::Value) -> Result<Self, EventError> {
        if !EVENT_NAMES.contains(&event) {
            return Err(EventError::UnknownEvent(event.to_owned()));
        }
        let serde_json::Value::Object(mut map) = payload else {
            return Err(EventError::NotAnObject(event.to_owned()));
        };
        map.insert(TAG.into(), serde_json::Value::String(event.to_owned()));

        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|source| EventError::Malformed { event: event.to_owned(), source })
    }
}

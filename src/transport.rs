//! Realtime transport seam.
//!
//! The session never talks to a network directly. It opens one [`Channel`]
//! per board through a [`Transport`] and receives everything the channel
//! produces (broadcasts, presence notifications, status changes) as
//! [`ChannelMessage`]s on an mpsc queue it owns.
//!
//! Production hosts implement these traits over their pub/sub service;
//! [`crate::hub::LocalHub`] is the in-memory implementation.

use tokio::sync::mpsc;

use crate::event::ErrorCode;
use crate::presence::PresenceRecord;

/// Channel topic for a board.
#[must_use]
pub fn board_topic(board_id: &str) -> String {
    format!("board:{board_id}")
}

/// Subscription status reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    Error,
    TimedOut,
    Closed,
}

/// Everything a channel delivers to its subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Broadcast { event: String, payload: serde_json::Value },
    /// Full presence table after a change. May hold several records per user.
    PresenceSync(Vec<PresenceRecord>),
    PresenceJoin(Vec<PresenceRecord>),
    /// `current` is the presence table after the leave.
    PresenceLeave { left: Vec<PresenceRecord>, current: Vec<PresenceRecord> },
    Status(ChannelStatus),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("channel {0} is not subscribed")]
    NotSubscribed(String),
    #[error("channel {0} is already subscribed")]
    AlreadySubscribed(String),
    #[error("transport failure: {0}")]
    Failed(String),
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotSubscribed(_) => "E_NOT_SUBSCRIBED",
            Self::AlreadySubscribed(_) => "E_ALREADY_SUBSCRIBED",
            Self::Failed(_) => "E_TRANSPORT",
        }
    }
}

/// One logical pub/sub channel.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    fn topic(&self) -> &str;

    /// Start delivery into `inbound`. The transport reports the outcome as a
    /// [`ChannelStatus`] message.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the channel cannot be joined.
    async fn subscribe(&self, inbound: mpsc::Sender<ChannelMessage>) -> Result<(), TransportError>;

    /// Broadcast `payload` under `event` to the other members.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the channel is not subscribed or the
    /// send fails.
    async fn send(&self, event: &str, payload: serde_json::Value) -> Result<(), TransportError>;

    /// Publish or replace this member's presence record.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the channel is not subscribed.
    async fn track(&self, presence: PresenceRecord) -> Result<(), TransportError>;

    /// Leave the channel. Other members see a presence leave.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the transport fails to leave cleanly.
    async fn unsubscribe(&self) -> Result<(), TransportError>;
}

/// Factory for channels.
pub trait Transport: Send + Sync {
    /// Open a channel on `topic`. `presence_key` groups the presence records
    /// of one member.
    fn channel(&self, topic: &str, presence_key: &str) -> Box<dyn Channel>;
}

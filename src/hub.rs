//! In-memory transport — board channels inside one process.
//!
//! DESIGN
//! ======
//! Topics map to member lists behind a `tokio::sync::RwLock`. Each member
//! holds the inbound sender its session handed to `subscribe`. Broadcasts
//! fan out to every other member (and to the sender too on a hub built with
//! [`LocalHub::with_self_echo`]). Delivery is best-effort `try_send`: a full
//! member queue drops the message, as a lossy network would.
//!
//! Presence follows the full-snapshot model: every track or leave is followed
//! by a `PresenceSync` carrying the whole table, after the matching
//! `PresenceJoin` / `PresenceLeave`.

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::presence::PresenceRecord;
use crate::transport::{Channel, ChannelMessage, ChannelStatus, Transport, TransportError};

// =============================================================================
// TOPIC STATE
// =============================================================================

struct Member {
    id: Uuid,
    presence_key: String,
    inbound: mpsc::Sender<ChannelMessage>,
    presence: Option<PresenceRecord>,
}

#[derive(Default)]
struct Topic {
    /// Members in join order.
    members: Vec<Member>,
}

impl Topic {
    fn presence(&self) -> Vec<PresenceRecord> {
        self.members
            .iter()
            .filter_map(|m| m.presence.clone())
            .collect()
    }

    fn deliver(&self, topic: &str, message: &ChannelMessage, skip: Option<Uuid>) {
        for member in &self.members {
            if skip == Some(member.id) {
                continue;
            }
            // Best-effort: if a member's queue is full, skip it.
            if member.inbound.try_send(message.clone()).is_err() {
                debug!(%topic, member = %member.id, "hub: dropped message for slow member");
            }
        }
    }

    /// Remove matching members; announce their presence leave to the rest.
    fn remove_where(&mut self, topic: &str, matches: impl Fn(&Member) -> bool) -> Vec<Member> {
        let (removed, kept): (Vec<Member>, Vec<Member>) = self.members.drain(..).partition(matches);
        self.members = kept;

        let left: Vec<PresenceRecord> = removed.iter().filter_map(|m| m.presence.clone()).collect();
        if !left.is_empty() {
            let current = self.presence();
            self.deliver(topic, &ChannelMessage::PresenceLeave { left, current: current.clone() }, None);
            self.deliver(topic, &ChannelMessage::PresenceSync(current), None);
        }
        removed
    }
}

// =============================================================================
// HUB
// =============================================================================

/// In-memory [`Transport`]. Clones share the same topics.
#[derive(Clone, Default)]
pub struct LocalHub {
    topics: Arc<RwLock<HashMap<String, Topic>>>,
    self_echo: bool,
}

impl LocalHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle whose channels also receive their own broadcasts.
    #[must_use]
    pub fn with_self_echo(&self) -> Self {
        Self { topics: Arc::clone(&self.topics), self_echo: true }
    }

    pub async fn member_count(&self, topic: &str) -> usize {
        let topics = self.topics.read().await;
        topics.get(topic).map_or(0, |t| t.members.len())
    }

    /// Presence table of `topic`, one record per tracked member.
    pub async fn presence(&self, topic: &str) -> Vec<PresenceRecord> {
        let topics = self.topics.read().await;
        topics.get(topic).map(Topic::presence).unwrap_or_default()
    }

    /// Push a status change to every member of `topic`.
    pub async fn inject_status(&self, topic: &str, status: ChannelStatus) {
        let topics = self.topics.read().await;
        if let Some(t) = topics.get(topic) {
            t.deliver(topic, &ChannelMessage::Status(status), None);
        }
    }

    /// Deliver a raw broadcast to every member of `topic`, as if sent by a
    /// client outside the hub.
    pub async fn inject_broadcast(&self, topic: &str, event: &str, payload: serde_json::Value) {
        let topics = self.topics.read().await;
        if let Some(t) = topics.get(topic) {
            let message = ChannelMessage::Broadcast { event: event.to_owned(), payload };
            t.deliver(topic, &message, None);
        }
    }

    /// Drop every member tracked under `presence_key` without their
    /// cooperation, as a presence timeout would. Returns how many were removed.
    pub async fn evict(&self, topic: &str, presence_key: &str) -> usize {
        let mut topics = self.topics.write().await;
        let Some(t) = topics.get_mut(topic) else {
            return 0;
        };
        let removed = t.remove_where(topic, |m| m.presence_key == presence_key);
        for member in &removed {
            if member.inbound.try_send(ChannelMessage::Status(ChannelStatus::Closed)).is_err() {
                debug!(%topic, member = %member.id, "hub: evicted member queue unavailable");
            }
        }
        if t.members.is_empty() {
            topics.remove(topic);
        }
        info!(%topic, %presence_key, removed = removed.len(), "hub: evicted members");
        removed.len()
    }
}

impl Transport for LocalHub {
    fn channel(&self, topic: &str, presence_key: &str) -> Box<dyn Channel> {
        Box::new(LocalChannel {
            hub: self.clone(),
            topic: topic.to_owned(),
            presence_key: presence_key.to_owned(),
            member: Mutex::new(None),
        })
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

struct LocalChannel {
    hub: LocalHub,
    topic: String,
    presence_key: String,
    /// Set while subscribed.
    member: Mutex<Option<Uuid>>,
}

impl LocalChannel {
    fn member_slot(&self) -> std::sync::MutexGuard<'_, Option<Uuid>> {
        self.member
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn member_id(&self) -> Result<Uuid, TransportError> {
        (*self.member_slot()).ok_or_else(|| TransportError::NotSubscribed(self.topic.clone()))
    }
}

#[async_trait::async_trait]
impl Channel for LocalChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn subscribe(&self, inbound: mpsc::Sender<ChannelMessage>) -> Result<(), TransportError> {
        if self.member_slot().is_some() {
            return Err(TransportError::AlreadySubscribed(self.topic.clone()));
        }
        let id = Uuid::new_v4();

        let mut topics = self.hub.topics.write().await;
        // Status goes out before the member is visible, so it precedes any broadcast.
        if inbound.try_send(ChannelMessage::Status(ChannelStatus::Subscribed)).is_err() {
            return Err(TransportError::Failed(format!("inbound queue for {} is unavailable", self.topic)));
        }
        let topic = topics.entry(self.topic.clone()).or_default();
        topic.members.push(Member { id, presence_key: self.presence_key.clone(), inbound, presence: None });
        info!(topic = %self.topic, member = %id, members = topic.members.len(), "hub: member subscribed");
        drop(topics);

        *self.member_slot() = Some(id);
        Ok(())
    }

    async fn send(&self, event: &str, payload: serde_json::Value) -> Result<(), TransportError> {
        let id = self.member_id()?;
        let topics = self.hub.topics.read().await;
        let Some(topic) = topics.get(&self.topic) else {
            return Err(TransportError::NotSubscribed(self.topic.clone()));
        };
        let skip = if self.hub.self_echo { None } else { Some(id) };
        let message = ChannelMessage::Broadcast { event: event.to_owned(), payload };
        topic.deliver(&self.topic, &message, skip);
        Ok(())
    }

    async fn track(&self, presence: PresenceRecord) -> Result<(), TransportError> {
        let id = self.member_id()?;
        let mut topics = self.hub.topics.write().await;
        let Some(topic) = topics.get_mut(&self.topic) else {
            return Err(TransportError::NotSubscribed(self.topic.clone()));
        };
        let Some(member) = topic.members.iter_mut().find(|m| m.id == id) else {
            return Err(TransportError::NotSubscribed(self.topic.clone()));
        };
        member.presence = Some(presence.clone());

        let current = topic.presence();
        topic.deliver(&self.topic, &ChannelMessage::PresenceJoin(vec![presence]), None);
        topic.deliver(&self.topic, &ChannelMessage::PresenceSync(current), None);
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        let Some(id) = self.member_slot().take() else {
            return Ok(());
        };
        let mut topics = self.hub.topics.write().await;
        let Some(topic) = topics.get_mut(&self.topic) else {
            return Ok(());
        };
        let removed = topic.remove_where(&self.topic, |m| m.id == id);
        for member in &removed {
            if member.inbound.try_send(ChannelMessage::Status(ChannelStatus::Closed)).is_err() {
                debug!(topic = %self.topic, member = %id, "hub: closed member queue unavailable");
            }
        }
        info!(topic = %self.topic, member = %id, remaining = topic.members.len(), "hub: member unsubscribed");
        if topic.members.is_empty() {
            topics.remove(&self.topic);
        }
        Ok(())
    }
}

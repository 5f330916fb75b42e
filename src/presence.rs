//! Presence records and the rules for turning transport presence
//! notifications into the online-user list.
//!
//! The transport reports presence as a full snapshot on every change and may
//! hold several records for one user (two tabs, a reconnect that has not
//! expired yet). Everything exposed to the host is keyed by user id.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::UserId;

/// Record published by a session on the channel's presence table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub username: String,
    /// RFC 3339 timestamp of the publish.
    pub online_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_scale: Option<f64>,
}

/// Entry of the online-user list. Same shape as the tracked record.
pub type OnlineUser = PresenceRecord;

impl PresenceRecord {
    /// Record stamped with the current time.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            online_at: now_rfc3339(),
            cursor_x: None,
            cursor_y: None,
            viewport_x: None,
            viewport_y: None,
            viewport_scale: None,
        }
    }

    #[must_use]
    pub fn with_viewport(mut self, x: f64, y: f64, scale: f64) -> Self {
        self.viewport_x = Some(x);
        self.viewport_y = Some(y);
        self.viewport_scale = Some(scale);
        self
    }

    /// `(x, y, scale)` when all three viewport fields are present.
    #[must_use]
    pub fn viewport(&self) -> Option<(f64, f64, f64)> {
        Some((self.viewport_x?, self.viewport_y?, self.viewport_scale?))
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

// =============================================================================
// SYNC
// =============================================================================

/// Collapse records to one per user id.
///
/// The last record for an id wins; the list keeps the order in which ids
/// first appear.
#[must_use]
pub fn dedupe_by_user(records: &[PresenceRecord]) -> Vec<OnlineUser> {
    let mut users: Vec<OnlineUser> = Vec::with_capacity(records.len());
    for record in records {
        match users.iter_mut().find(|u| u.user_id == record.user_id) {
            Some(existing) => *existing = record.clone(),
            None => users.push(record.clone()),
        }
    }
    users
}

/// True when both lists hold the same set of user ids.
///
/// Heartbeats re-stamp `online_at` on every publish, so comparing whole
/// records would report a change every interval.
#[must_use]
pub fn same_users(a: &[OnlineUser], b: &[OnlineUser]) -> bool {
    let ids_a: HashSet<UserId> = a.iter().map(|u| u.user_id).collect();
    let ids_b: HashSet<UserId> = b.iter().map(|u| u.user_id).collect();
    ids_a == ids_b
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Users in a join notification other than `local`, deduplicated.
#[must_use]
pub fn joined_users(joined: &[PresenceRecord], local: UserId) -> Vec<OnlineUser> {
    dedupe_by_user(joined)
        .into_iter()
        .filter(|u| u.user_id != local)
        .collect()
}

/// Users from a leave notification whose per-user state should be dropped.
///
/// Skips the local user, and anyone still present in `current` (a second tab
/// or a reconnect reported as leave + join).
#[must_use]
pub fn departed_users(left: &[PresenceRecord], current: &[PresenceRecord], local: UserId) -> Vec<UserId> {
    let still_present: HashSet<UserId> = current.iter().map(|r| r.user_id).collect();
    let mut departed: Vec<UserId> = Vec::new();
    for record in left {
        let id = record.user_id;
        if id == local || still_present.contains(&id) || departed.contains(&id) {
            continue;
        }
        departed.push(id);
    }
    departed
}

//! Session configuration.
//!
//! Defaults are the production values. `from_env` lets a deployment tune the
//! heartbeat and throttle floors without a rebuild; unparsable values fall
//! back to the defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::rate_limit::ThrottleKind;

pub const DEFAULT_HEARTBEAT_SECS: u64 = 15;
pub const DEFAULT_ELEMENT_UPDATE_MS: u64 = 100;
pub const DEFAULT_CURSOR_MOVE_MS: u64 = 50;
pub const DEFAULT_VIEWPORT_CHANGE_MS: u64 = 200;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Shortest heartbeat a session will run with.
pub const MIN_HEARTBEAT: Duration = Duration::from_secs(1);

// =============================================================================
// THROTTLE
// =============================================================================

/// Minimum interval between two outbound broadcasts of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub element_update: Duration,
    pub cursor_move: Duration,
    pub viewport_change: Duration,
}

impl ThrottleConfig {
    #[must_use]
    pub fn floor(&self, kind: ThrottleKind) -> Duration {
        match kind {
            ThrottleKind::ElementUpdate => self.element_update,
            ThrottleKind::CursorMove => self.cursor_move,
            ThrottleKind::ViewportChange => self.viewport_change,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            element_update: Duration::from_millis(DEFAULT_ELEMENT_UPDATE_MS),
            cursor_move: Duration::from_millis(DEFAULT_CURSOR_MOVE_MS),
            viewport_change: Duration::from_millis(DEFAULT_VIEWPORT_CHANGE_MS),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interval at which presence is re-published while connected.
    pub heartbeat: Duration,
    pub throttle: ThrottleConfig,
    /// Capacity of the inbound and outbound session queues.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            throttle: ThrottleConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Read overrides from the process environment.
    ///
    /// - `BOARD_HEARTBEAT_SECS`
    /// - `BOARD_THROTTLE_ELEMENT_UPDATE_MS`
    /// - `BOARD_THROTTLE_CURSOR_MOVE_MS`
    /// - `BOARD_THROTTLE_VIEWPORT_CHANGE_MS`
    /// - `BOARD_QUEUE_CAPACITY`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let heartbeat_secs = env_parse(&lookup, "BOARD_HEARTBEAT_SECS", DEFAULT_HEARTBEAT_SECS);
        let element_ms = env_parse(&lookup, "BOARD_THROTTLE_ELEMENT_UPDATE_MS", DEFAULT_ELEMENT_UPDATE_MS);
        let cursor_ms = env_parse(&lookup, "BOARD_THROTTLE_CURSOR_MOVE_MS", DEFAULT_CURSOR_MOVE_MS);
        let viewport_ms = env_parse(&lookup, "BOARD_THROTTLE_VIEWPORT_CHANGE_MS", DEFAULT_VIEWPORT_CHANGE_MS);
        let queue_capacity = env_parse(&lookup, "BOARD_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY);

        Self {
            heartbeat: Duration::from_secs(heartbeat_secs),
            throttle: ThrottleConfig {
                element_update: Duration::from_millis(element_ms),
                cursor_move: Duration::from_millis(cursor_ms),
                viewport_change: Duration::from_millis(viewport_ms),
            },
            queue_capacity,
        }
        .normalized()
    }

    /// Raise the heartbeat to at least [`MIN_HEARTBEAT`] and the queue
    /// capacity to at least one. A zero period makes the heartbeat interval
    /// panic and a zero-capacity queue cannot be created.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            heartbeat: self.heartbeat.max(MIN_HEARTBEAT),
            queue_capacity: self.queue_capacity.max(1),
            ..self
        }
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

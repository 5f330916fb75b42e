//! Outbound broadcast throttling.
//!
//! DESIGN
//! ======
//! One "last sent" instant per [`ThrottleKind`]. A call is allowed when the
//! floor for its kind has elapsed since the last allowed call; otherwise it
//! is dropped. Nothing is queued or coalesced: callers re-send on every
//! pointer move, so the latest state goes out on the next allowed tick.
//!
//! Timestamps come from `tokio::time::Instant` so tests can drive the clock
//! with a paused runtime.

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod rate_limit_test;

use std::sync::Mutex;

use tokio::time::Instant;

use crate::config::ThrottleConfig;

/// High-frequency broadcast kinds that pass through the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleKind {
    ElementUpdate,
    CursorMove,
    ViewportChange,
}

impl ThrottleKind {
    pub const ALL: [ThrottleKind; 3] = [Self::ElementUpdate, Self::CursorMove, Self::ViewportChange];

    fn slot(self) -> usize {
        match self {
            Self::ElementUpdate => 0,
            Self::CursorMove => 1,
            Self::ViewportChange => 2,
        }
    }
}

pub struct RateLimiter {
    floors: ThrottleConfig,
    last_sent: Mutex<[Option<Instant>; 3]>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(floors: ThrottleConfig) -> Self {
        Self { floors, last_sent: Mutex::new([None; 3]) }
    }

    /// Check the floor for `kind` and record the send if allowed.
    pub fn allow(&self, kind: ThrottleKind) -> bool {
        self.allow_at(kind, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit timestamp.
    pub fn allow_at(&self, kind: ThrottleKind, now: Instant) -> bool {
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let slot = &mut last_sent[kind.slot()];

        if let Some(prev) = *slot {
            if now.saturating_duration_since(prev) < self.floors.floor(kind) {
                return false;
            }
        }
        *slot = Some(now);
        true
    }

    /// Forget every recorded send.
    pub fn reset(&self) {
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *last_sent = [None; 3];
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

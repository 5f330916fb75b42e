//! Ephemeral per-user state: remote cursors, typing indicators and remote
//! viewports.
//!
//! DESIGN
//! ======
//! Each store is an [`EphemeralStore`]: a list plus a set of subscriber
//! callbacks. Every mutation that changes the list publishes the full
//! snapshot to every subscriber. A new subscriber is called once, right
//! away, with the current snapshot.
//!
//! High-frequency data (cursor moves arrive up to 20/s per participant) stays
//! out of the session's online-user and connection watches, so only the
//! consumers that draw cursors pay for cursor updates.
//!
//! Publishing is serialized by a per-store delivery lock, taken before the
//! state lock and held until every subscriber has seen the snapshot. A
//! subscriber therefore never sees an older snapshot after a newer one, and
//! `close` returns only once the empty snapshot is out. Callbacks run with
//! the state lock released: a callback may read the store or drop its
//! subscription, but must not mutate or subscribe to the same store.

#[cfg(test)]
#[path = "stores_test.rs"]
mod stores_test;

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use crate::UserId;

/// Colors handed to remote cursors, indexed by `user_id mod 8`.
pub const CURSOR_PALETTE: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
];

/// Palette color for a user.
#[must_use]
pub fn cursor_color(user_id: UserId) -> &'static str {
    #[allow(clippy::cast_possible_wrap)]
    let len = CURSOR_PALETTE.len() as i64;
    let idx = usize::try_from(user_id.rem_euclid(len)).unwrap_or(0);
    CURSOR_PALETTE[idx]
}

/// Current time as milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// ENTRIES
// =============================================================================

/// Entries that belong to a single user.
pub trait UserScoped {
    fn user_id(&self) -> UserId;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCursor {
    pub user_id: UserId,
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    /// Milliseconds since the Unix epoch.
    pub last_update: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUser {
    pub user_id: UserId,
    pub username: String,
    pub element_id: String,
    pub started_at: i64,
}

/// Another participant's viewport, for follow mode. Never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteViewport {
    pub user_id: UserId,
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub last_update: i64,
}

impl UserScoped for RemoteCursor {
    fn user_id(&self) -> UserId {
        self.user_id
    }
}

impl UserScoped for TypingUser {
    fn user_id(&self) -> UserId {
        self.user_id
    }
}

impl UserScoped for RemoteViewport {
    fn user_id(&self) -> UserId {
        self.user_id
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle for a store subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the callback registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// =============================================================================
// STORE
// =============================================================================

type Callback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct StoreInner<T> {
    items: Vec<T>,
    subscribers: Vec<(u64, Callback<T>)>,
    next_subscriber: u64,
    /// Set on session teardown; later mutations are ignored.
    closed: bool,
}

/// List of ephemeral entries with snapshot subscriptions. Cloning shares the store.
pub struct EphemeralStore<T> {
    inner: Arc<Mutex<StoreInner<T>>>,
    /// Held across snapshot and notify.
    delivery: Arc<Mutex<()>>,
}

impl<T> Clone for EphemeralStore<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), delivery: Arc::clone(&self.delivery) }
    }
}

impl<T: Clone + Send + 'static> Default for EphemeralStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> EphemeralStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                items: Vec::new(),
                subscribers: Vec::new(),
                next_subscriber: 0,
                closed: false,
            })),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    fn deliver(&self) -> std::sync::MutexGuard<'_, ()> {
        self.delivery
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner<T>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Register `callback` and call it once with the current snapshot.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let delivering = self.deliver();
        let (id, items) = {
            let mut inner = self.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.push((id, Arc::clone(&callback)));
            (id, inner.items.clone())
        };
        callback(&items);
        drop(delivering);

        let weak: Weak<Mutex<StoreInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    inner.subscribers.retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    /// Apply `mutate`; publish when it reports a change.
    fn update(&self, mutate: impl FnOnce(&mut Vec<T>) -> bool) {
        let _delivering = self.deliver();
        let (items, subscribers) = {
            let mut inner = self.lock();
            if inner.closed || !mutate(&mut inner.items) {
                return;
            }
            (inner.items.clone(), subscriber_list(&inner))
        };
        notify(&subscribers, &items);
    }

    /// Remove every entry and publish the empty snapshot.
    pub fn clear(&self) {
        let _delivering = self.deliver();
        let subscribers = {
            let mut inner = self.lock();
            inner.items.clear();
            subscriber_list(&inner)
        };
        notify(&subscribers, &[]);
    }

    /// Clear, publish the empty snapshot and ignore all later mutations.
    pub fn close(&self) {
        let _delivering = self.deliver();
        let subscribers = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.items.clear();
            subscriber_list(&inner)
        };
        notify(&subscribers, &[]);
    }
}

impl<T: UserScoped + Clone + Send + 'static> EphemeralStore<T> {
    /// Drop every entry belonging to one of `users`. Publishes only on change.
    pub fn remove_users(&self, users: &[UserId]) {
        if users.is_empty() {
            return;
        }
        self.update(|items| {
            let before = items.len();
            items.retain(|item| !users.contains(&item.user_id()));
            items.len() != before
        });
    }
}

fn subscriber_list<T>(inner: &StoreInner<T>) -> Vec<Callback<T>> {
    inner
        .subscribers
        .iter()
        .map(|(_, cb)| Arc::clone(cb))
        .collect()
}

fn notify<T>(subscribers: &[Callback<T>], items: &[T]) {
    for callback in subscribers {
        callback(items);
    }
}

// =============================================================================
// CURSORS
// =============================================================================

pub type CursorStore = EphemeralStore<RemoteCursor>;

impl EphemeralStore<RemoteCursor> {
    /// Move a user's cursor, or add it with the user's palette color.
    ///
    /// An existing entry keeps its color and username.
    pub fn upsert_cursor(&self, user_id: UserId, username: &str, x: f64, y: f64, now_ms: i64) {
        self.update(|cursors| {
            if let Some(cursor) = cursors.iter_mut().find(|c| c.user_id == user_id) {
                cursor.x = x;
                cursor.y = y;
                cursor.last_update = now_ms;
            } else {
                cursors.push(RemoteCursor {
                    user_id,
                    username: username.to_owned(),
                    x,
                    y,
                    color: cursor_color(user_id).to_owned(),
                    last_update: now_ms,
                });
            }
            true
        });
    }
}

// =============================================================================
// TYPING
// =============================================================================

pub type TypingStore = EphemeralStore<TypingUser>;

impl EphemeralStore<TypingUser> {
    /// Mark `user_id` as editing `element_id`. No-op if already marked.
    pub fn start_typing(&self, user_id: UserId, username: &str, element_id: &str, now_ms: i64) {
        self.update(|typing| {
            if typing
                .iter()
                .any(|t| t.user_id == user_id && t.element_id == element_id)
            {
                return false;
            }
            typing.push(TypingUser {
                user_id,
                username: username.to_owned(),
                element_id: element_id.to_owned(),
                started_at: now_ms,
            });
            true
        });
    }

    pub fn stop_typing(&self, user_id: UserId, element_id: &str) {
        self.update(|typing| {
            let before = typing.len();
            typing.retain(|t| !(t.user_id == user_id && t.element_id == element_id));
            typing.len() != before
        });
    }
}

// =============================================================================
// VIEWPORTS
// =============================================================================

pub type ViewportStore = EphemeralStore<RemoteViewport>;

impl EphemeralStore<RemoteViewport> {
    pub fn upsert_viewport(&self, user_id: UserId, username: &str, x: f64, y: f64, scale: f64, now_ms: i64) {
        self.update(|viewports| {
            if let Some(vp) = viewports.iter_mut().find(|v| v.user_id == user_id) {
                vp.x = x;
                vp.y = y;
                vp.scale = scale;
                vp.last_update = now_ms;
            } else {
                viewports.push(RemoteViewport { user_id, username: username.to_owned(), x, y, scale, last_update: now_ms });
            }
            true
        });
    }
}

// =============================================================================
// BUNDLE
// =============================================================================

/// The three stores a session owns.
#[derive(Clone, Default)]
pub struct Stores {
    pub cursors: CursorStore,
    pub typing: TypingStore,
    pub viewports: ViewportStore,
}

impl Stores {
    /// Drop all per-user state for users that left the board.
    pub fn remove_users(&self, users: &[UserId]) {
        self.cursors.remove_users(users);
        self.typing.remove_users(users);
        self.viewports.remove_users(users);
    }

    pub fn close(&self) {
        self.cursors.close();
        self.typing.close();
        self.viewports.close();
    }
}

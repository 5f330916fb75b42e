//! Collaboration session — one board channel per open board.
//!
//! DESIGN
//! ======
//! `start` spawns one task that owns the [`Channel`] and enters a `select!`
//! loop:
//! - Inbound channel messages → decode + dispatch to stores and handler slots
//! - Outbound commands from the broadcast functions → `Channel::send` / `track`
//! - Heartbeat tick while connected → re-track presence
//!
//! The host-facing [`CollabSession`] and the task share `Shared`. Broadcast
//! functions never await: outside `Connected` they return `false` without
//! touching the throttle, otherwise they gate, encode and enqueue, returning
//! whether the event was queued. Delivery is fire-and-forget.
//!
//! LIFECYCLE
//! =========
//! 1. `start` → `Connecting`, channel opened, task spawned
//! 2. Transport reports `Subscribed` → `Connected`, presence tracked, heartbeat armed
//! 3. `Error` / `TimedOut` / `Closed` → `Disconnected` (no reconnect here)
//! 4. `close` or drop → stores cleared and published, task unsubscribes and exits

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use canvas::DrawingElement;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::UserId;
use crate::config::SessionConfig;
use crate::event::{BoardEvent, ErrorCode};
use crate::presence::{self, OnlineUser, PresenceRecord};
use crate::rate_limit::{RateLimiter, ThrottleKind};
use crate::stores::{self, RemoteCursor, RemoteViewport, Stores, Subscription, TypingUser};
use crate::transport::{self, Channel, ChannelMessage, ChannelStatus, Transport};

// =============================================================================
// TYPES
// =============================================================================

/// Authenticated user the session acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUser {
    pub id: UserId,
    pub username: String,
}

impl LocalUser {
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self { id, username: username.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("board id is empty")]
    EmptyBoardId,
    #[error("no tokio runtime is running")]
    NoRuntime,
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyBoardId => "E_EMPTY_BOARD_ID",
            Self::NoRuntime => "E_NO_RUNTIME",
        }
    }
}

/// Handler for remote element creates and updates: `(element, user_id, username)`.
pub type ElementHandler = Arc<dyn Fn(&DrawingElement, UserId, &str) + Send + Sync>;
/// Handler for remote deletes: `(element_id, user_id, username)`.
pub type DeleteHandler = Arc<dyn Fn(&str, UserId, &str) + Send + Sync>;
pub type BatchHandler = Arc<dyn Fn(&[DrawingElement], UserId, &str) + Send + Sync>;
/// Handler for remote cursor moves: `(x, y, user_id, username)`.
pub type CursorHandler = Arc<dyn Fn(f64, f64, UserId, &str) + Send + Sync>;

/// One slot per inbound element-event kind; registering replaces.
#[derive(Clone, Default)]
struct Handlers {
    created: Option<ElementHandler>,
    updated: Option<ElementHandler>,
    deleted: Option<DeleteHandler>,
    batch: Option<BatchHandler>,
    cursor: Option<CursorHandler>,
}

enum Command {
    Send { event: &'static str, payload: serde_json::Value },
    TrackViewport { x: f64, y: f64, scale: f64 },
}

// =============================================================================
// SHARED STATE
// =============================================================================

struct Shared {
    user: LocalUser,
    board_id: String,
    stores: Stores,
    handlers: Mutex<Handlers>,
    limiter: RateLimiter,
    state: watch::Sender<ConnectionState>,
    online: watch::Sender<Vec<OnlineUser>>,
    /// Set once by `close`; the session never leaves `Disconnected` after.
    closed: AtomicBool,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Move to `next`. Returns true if the state changed.
    fn set_state(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == next || (self.is_closed() && next != ConnectionState::Disconnected) {
                return false;
            }
            *state = next;
            true
        })
    }

    fn handlers(&self) -> Handlers {
        self.handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set_handler(&self, install: impl FnOnce(&mut Handlers)) {
        let mut handlers = self
            .handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        install(&mut handlers);
    }

    /// Route one inbound event. Handlers run outside the slot lock.
    fn dispatch(&self, event: BoardEvent) {
        if event.user_id() == self.user.id {
            trace!(board = %self.board_id, event = event.name(), "session: dropping self echo");
            return;
        }
        if self.is_closed() {
            return;
        }
        let handlers = self.handlers();
        let now = stores::now_ms();

        match event {
            BoardEvent::ElementCreated { element, user_id, username } => {
                debug!(board = %self.board_id, kind = element.kind(), element = %element.id(), from = user_id, "session: remote element created");
                if let Some(handler) = handlers.created {
                    handler(&element, user_id, &username);
                }
            }
            BoardEvent::ElementUpdated { element, user_id, username } => {
                debug!(board = %self.board_id, kind = element.kind(), element = %element.id(), from = user_id, "session: remote element updated");
                if let Some(handler) = handlers.updated {
                    handler(&element, user_id, &username);
                }
            }
            BoardEvent::ElementDeleted { element_id, user_id, username } => {
                debug!(board = %self.board_id, element = %element_id, from = user_id, "session: remote element deleted");
                if let Some(handler) = handlers.deleted {
                    handler(&element_id, user_id, &username);
                }
            }
            BoardEvent::ElementsBatch { elements, user_id, username } => {
                debug!(board = %self.board_id, count = elements.len(), from = user_id, "session: remote element batch");
                if let Some(handler) = handlers.batch {
                    handler(&elements, user_id, &username);
                }
            }
            BoardEvent::CursorMoved { x, y, user_id, username } => {
                self.stores.cursors.upsert_cursor(user_id, &username, x, y, now);
                if let Some(handler) = handlers.cursor {
                    handler(x, y, user_id, &username);
                }
            }
            BoardEvent::TypingStarted { element_id, user_id, username } => {
                self.stores.typing.start_typing(user_id, &username, &element_id, now);
            }
            BoardEvent::TypingStopped { element_id, user_id, .. } => {
                self.stores.typing.stop_typing(user_id, &element_id);
            }
            BoardEvent::ViewportChanged { x, y, scale, user_id, username } => {
                self.stores.viewports.upsert_viewport(user_id, &username, x, y, scale, now);
            }
        }
    }

    fn on_broadcast(&self, event: &str, payload: serde_json::Value) {
        match BoardEvent::decode(event, payload) {
            Ok(event) => self.dispatch(event),
            Err(e) => {
                debug!(board = %self.board_id, code = e.error_code(), error = %e, "session: dropping malformed event");
            }
        }
    }

    fn on_presence_sync(&self, records: &[PresenceRecord]) {
        let users = presence::dedupe_by_user(records);
        let count = users.len();
        let changed = self.online.send_if_modified(|current| {
            if self.is_closed() || presence::same_users(current, &users) {
                return false;
            }
            *current = users;
            true
        });
        if changed {
            info!(board = %self.board_id, online = count, "session: online users changed");
        }
    }

    fn on_presence_join(&self, joined: &[PresenceRecord]) {
        for user in presence::joined_users(joined, self.user.id) {
            debug!(board = %self.board_id, user = user.user_id, username = %user.username, "session: user joined");
        }
    }

    fn on_presence_leave(&self, left: &[PresenceRecord], current: &[PresenceRecord]) {
        let departed = presence::departed_users(left, current, self.user.id);
        if departed.is_empty() {
            return;
        }
        info!(board = %self.board_id, users = ?departed, "session: users left");
        self.stores.remove_users(&departed);
    }

    fn presence_record(&self, viewport: Option<(f64, f64, f64)>) -> PresenceRecord {
        let record = PresenceRecord::new(self.user.id, self.user.username.clone());
        match viewport {
            Some((x, y, scale)) => record.with_viewport(x, y, scale),
            None => record,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Live collaboration on one board. Dropping the session tears it down.
pub struct CollabSession {
    shared: Arc<Shared>,
    commands: mpsc::Sender<Command>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    task: Option<JoinHandle<()>>,
}

impl CollabSession {
    /// Open the board channel and start the session task.
    ///
    /// Returns immediately in [`ConnectionState::Connecting`]; the state moves
    /// to `Connected` once the transport confirms the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyBoardId`] for a blank board id and
    /// [`SessionError::NoRuntime`] when called outside a tokio runtime.
    pub fn start(
        transport: &dyn Transport,
        board_id: &str,
        user: LocalUser,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if board_id.trim().is_empty() {
            return Err(SessionError::EmptyBoardId);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let config = config.normalized();

        let channel = transport.channel(&transport::board_topic(board_id), &user.id.to_string());
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let (online, _) = watch::channel(Vec::new());
        let shared = Arc::new(Shared {
            user,
            board_id: board_id.to_owned(),
            stores: Stores::default(),
            handlers: Mutex::new(Handlers::default()),
            limiter: RateLimiter::new(config.throttle),
            state,
            online,
            closed: AtomicBool::new(false),
        });

        let (command_tx, command_rx) = mpsc::channel(config.queue_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();

        info!(board = %shared.board_id, user = shared.user.id, username = %shared.user.username, "session: connecting");
        let task = runtime.spawn(run_session(Arc::clone(&shared), channel, command_rx, stop_rx, config));

        Ok(Self { shared, commands: command_tx, stop: Mutex::new(Some(stop_tx)), task: Some(task) })
    }

    // --- accessors ---

    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.shared.board_id
    }

    #[must_use]
    pub fn user(&self) -> &LocalUser {
        &self.shared.user
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Deduplicated online users, one entry per user id.
    #[must_use]
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.shared.online.borrow().clone()
    }

    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Receiver woken only when the set of online user ids changes.
    #[must_use]
    pub fn watch_online_users(&self) -> watch::Receiver<Vec<OnlineUser>> {
        self.shared.online.subscribe()
    }

    // --- ephemeral state ---

    pub fn subscribe_cursors<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[RemoteCursor]) + Send + Sync + 'static,
    {
        self.shared.stores.cursors.subscribe(callback)
    }

    pub fn subscribe_typing<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[TypingUser]) + Send + Sync + 'static,
    {
        self.shared.stores.typing.subscribe(callback)
    }

    pub fn subscribe_viewports<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[RemoteViewport]) + Send + Sync + 'static,
    {
        self.shared.stores.viewports.subscribe(callback)
    }

    // --- inbound handlers ---

    pub fn on_remote_element_created<F>(&self, handler: F)
    where
        F: Fn(&DrawingElement, UserId, &str) + Send + Sync + 'static,
    {
        self.shared.set_handler(|h| h.created = Some(Arc::new(handler)));
    }

    pub fn on_remote_element_updated<F>(&self, handler: F)
    where
        F: Fn(&DrawingElement, UserId, &str) + Send + Sync + 'static,
    {
        self.shared.set_handler(|h| h.updated = Some(Arc::new(handler)));
    }

    pub fn on_remote_element_deleted<F>(&self, handler: F)
    where
        F: Fn(&str, UserId, &str) + Send + Sync + 'static,
    {
        self.shared.set_handler(|h| h.deleted = Some(Arc::new(handler)));
    }

    pub fn on_remote_elements_batch<F>(&self, handler: F)
    where
        F: Fn(&[DrawingElement], UserId, &str) + Send + Sync + 'static,
    {
        self.shared.set_handler(|h| h.batch = Some(Arc::new(handler)));
    }

    pub fn on_remote_cursor_move<F>(&self, handler: F)
    where
        F: Fn(f64, f64, UserId, &str) + Send + Sync + 'static,
    {
        self.shared.set_handler(|h| h.cursor = Some(Arc::new(handler)));
    }

    // --- broadcast ---

    pub fn broadcast_element_created(&self, element: &DrawingElement) -> bool {
        self.broadcast(None, |user_id, username| BoardEvent::ElementCreated { element: element.clone(), user_id, username })
    }

    /// Throttled to one per element-update floor.
    pub fn broadcast_element_updated(&self, element: &DrawingElement) -> bool {
        self.broadcast(Some(ThrottleKind::ElementUpdate), |user_id, username| BoardEvent::ElementUpdated {
            element: element.clone(),
            user_id,
            username,
        })
    }

    pub fn broadcast_element_deleted(&self, element_id: &str) -> bool {
        self.broadcast(None, |user_id, username| BoardEvent::ElementDeleted {
            element_id: element_id.to_owned(),
            user_id,
            username,
        })
    }

    pub fn broadcast_elements_batch(&self, elements: &[DrawingElement]) -> bool {
        self.broadcast(None, |user_id, username| BoardEvent::ElementsBatch { elements: elements.to_vec(), user_id, username })
    }

    /// Throttled to one per cursor-move floor.
    pub fn broadcast_cursor_move(&self, x: f64, y: f64) -> bool {
        self.broadcast(Some(ThrottleKind::CursorMove), |user_id, username| BoardEvent::CursorMoved { x, y, user_id, username })
    }

    pub fn broadcast_typing_started(&self, element_id: &str) -> bool {
        self.broadcast(None, |user_id, username| BoardEvent::TypingStarted {
            element_id: element_id.to_owned(),
            user_id,
            username,
        })
    }

    pub fn broadcast_typing_stopped(&self, element_id: &str) -> bool {
        self.broadcast(None, |user_id, username| BoardEvent::TypingStopped {
            element_id: element_id.to_owned(),
            user_id,
            username,
        })
    }

    /// Throttled to one per viewport-change floor.
    pub fn broadcast_viewport_change(&self, x: f64, y: f64, scale: f64) -> bool {
        self.broadcast(Some(ThrottleKind::ViewportChange), |user_id, username| BoardEvent::ViewportChanged {
            x,
            y,
            scale,
            user_id,
            username,
        })
    }

    /// Re-publish presence with the local viewport. Later heartbeats keep it.
    pub fn update_viewport_presence(&self, x: f64, y: f64, scale: f64) -> bool {
        if self.shared.is_closed() {
            return false;
        }
        if let Err(e) = self.commands.try_send(Command::TrackViewport { x, y, scale }) {
            debug!(board = %self.shared.board_id, error = %e, "session: viewport presence not queued");
            return false;
        }
        true
    }

    /// Gate, stamp with the local identity, encode and enqueue.
    fn broadcast(&self, throttle: Option<ThrottleKind>, build: impl FnOnce(UserId, String) -> BoardEvent) -> bool {
        if self.shared.is_closed() {
            return false;
        }
        if !self.is_connected() {
            trace!(board = %self.shared.board_id, "session: not connected, broadcast dropped");
            return false;
        }
        if let Some(kind) = throttle {
            if !self.shared.limiter.allow(kind) {
                debug!(board = %self.shared.board_id, ?kind, "session: broadcast throttled");
                return false;
            }
        }

        let event = build(self.shared.user.id, self.shared.user.username.clone());
        let (name, payload) = match event.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                warn!(board = %self.shared.board_id, code = e.error_code(), error = %e, "session: failed to encode event");
                return false;
            }
        };
        if let Err(e) = self.commands.try_send(Command::Send { event: name, payload }) {
            debug!(board = %self.shared.board_id, event = name, error = %e, "session: outbound queue rejected event");
            return false;
        }
        true
    }

    // --- teardown ---

    /// Clear and publish every store, drop the online list, go `Disconnected`
    /// and stop the session task. Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.stores.close();
        self.shared.online.send_if_modified(|users| {
            if users.is_empty() {
                return false;
            }
            users.clear();
            true
        });
        self.shared.set_state(ConnectionState::Disconnected);

        let stop = self
            .stop
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(stop) = stop {
            if stop.send(()).is_err() {
                trace!(board = %self.shared.board_id, "session: task already stopped");
            }
        }
        info!(board = %self.shared.board_id, user = self.shared.user.id, "session: closed");
    }

    /// [`close`](Self::close), then wait for the task to leave the channel.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(board = %self.shared.board_id, error = %e, "session: task ended abnormally");
            }
        }
    }
}

impl Drop for CollabSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CollabSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabSession")
            .field("board_id", &self.shared.board_id)
            .field("user", &self.shared.user)
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TASK
// =============================================================================

async fn run_session(
    shared: Arc<Shared>,
    channel: Box<dyn Channel>,
    mut commands: mpsc::Receiver<Command>,
    mut stop: oneshot::Receiver<()>,
    config: SessionConfig,
) {
    let (inbound_tx, mut inbound) = mpsc::channel(config.queue_capacity);
    if let Err(e) = channel.subscribe(inbound_tx).await {
        warn!(board = %shared.board_id, code = e.error_code(), error = %e, "session: subscribe failed");
        shared.set_state(ConnectionState::Disconnected);
        return;
    }

    let mut heartbeat = tokio::time::interval_at(Instant::now() + config.heartbeat, config.heartbeat);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut connected = false;
    let mut viewport: Option<(f64, f64, f64)> = None;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            Some(command) = commands.recv() => match command {
                Command::Send { event, payload } => {
                    if let Err(e) = channel.send(event, payload).await {
                        warn!(board = %shared.board_id, event, code = e.error_code(), error = %e, "session: send failed");
                    }
                }
                Command::TrackViewport { x, y, scale } => {
                    viewport = Some((x, y, scale));
                    if connected {
                        track_presence(&shared, channel.as_ref(), viewport).await;
                    }
                }
            },
            message = inbound.recv() => {
                let Some(message) = message else {
                    debug!(board = %shared.board_id, "session: transport closed inbound queue");
                    break;
                };
                if shared.is_closed() {
                    break;
                }
                match message {
                    ChannelMessage::Status(status) => {
                        connected = on_status(&shared, status);
                        if connected {
                            heartbeat.reset();
                            track_presence(&shared, channel.as_ref(), viewport).await;
                        }
                    }
                    ChannelMessage::Broadcast { event, payload } => shared.on_broadcast(&event, payload),
                    ChannelMessage::PresenceSync(records) => shared.on_presence_sync(&records),
                    ChannelMessage::PresenceJoin(records) => shared.on_presence_join(&records),
                    ChannelMessage::PresenceLeave { left, current } => shared.on_presence_leave(&left, &current),
                }
            }
            _ = heartbeat.tick(), if connected => {
                trace!(board = %shared.board_id, "session: heartbeat");
                track_presence(&shared, channel.as_ref(), viewport).await;
            }
        }
    }

    if let Err(e) = channel.unsubscribe().await {
        warn!(board = %shared.board_id, code = e.error_code(), error = %e, "session: unsubscribe failed");
    }
    shared.set_state(ConnectionState::Disconnected);
    info!(board = %shared.board_id, "session: disconnected");
}

/// Apply a transport status. Returns whether the channel is now usable.
fn on_status(shared: &Shared, status: ChannelStatus) -> bool {
    match status {
        ChannelStatus::Subscribed => {
            if shared.set_state(ConnectionState::Connected) {
                info!(board = %shared.board_id, "session: connected");
            }
            true
        }
        ChannelStatus::Error | ChannelStatus::TimedOut => {
            if shared.set_state(ConnectionState::Disconnected) {
                warn!(board = %shared.board_id, ?status, "session: channel unavailable");
            }
            false
        }
        ChannelStatus::Closed => {
            if shared.set_state(ConnectionState::Disconnected) {
                info!(board = %shared.board_id, "session: channel closed");
            }
            false
        }
    }
}

async fn track_presence(shared: &Shared, channel: &dyn Channel, viewport: Option<(f64, f64, f64)>) {
    if let Err(e) = channel.track(shared.presence_record(viewport)).await {
        warn!(board = %shared.board_id, code = e.error_code(), error = %e, "session: presence track failed");
    }
}

//! Realtime collaboration core for a shared whiteboard.
//!
//! ARCHITECTURE
//! ============
//! One [`CollabSession`] per open board. The session owns a logical channel
//! on an external pub/sub transport (see [`transport`]), tracks presence,
//! dispatches inbound [`BoardEvent`]s to the ephemeral stores and to the
//! host's element handlers, and exposes rate-limited broadcast functions.
//!
//! The authoritative element list lives in the host. Geometry (hit-testing,
//! resize, translate) comes from the `canvas` crate, re-exported here.
//!
//! | Module | Role |
//! |--------|------|
//! | [`event`] | Wire events and their JSON codec |
//! | [`presence`] | Presence records, dedupe and leave filtering |
//! | [`stores`] | Cursor / typing / viewport stores with snapshot subscriptions |
//! | [`rate_limit`] | Per-kind minimum-interval gate for outbound broadcasts |
//! | [`transport`] | Channel traits the session consumes |
//! | [`hub`] | In-memory transport for tests and local demos |
//! | [`session`] | Connection lifecycle, heartbeat, dispatch, broadcast |
//! | [`config`] | Heartbeat and throttle settings |

pub mod config;
pub mod event;
pub mod hub;
pub mod presence;
pub mod rate_limit;
pub mod session;
pub mod stores;
pub mod transport;

pub use canvas;
pub use canvas::DrawingElement;
pub use config::SessionConfig;
pub use event::BoardEvent;
pub use hub::LocalHub;
pub use presence::OnlineUser;
pub use session::{CollabSession, ConnectionState, LocalUser};
pub use stores::Subscription;

/// Numeric user identifier shared by presence records and events.
pub type UserId = i64;

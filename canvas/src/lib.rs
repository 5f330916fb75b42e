//! Geometry engine for the collaborative whiteboard.
//!
//! Pure functions over drawing elements: the host feeds pointer positions in,
//! gets hit/handle/translation answers back, mutates its own element list and
//! hands the result to the collaboration session for broadcast. Nothing here
//! holds state between calls or performs I/O.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`element`] | Drawing element types and their wire form |
//! | [`camera`] | Viewport transform, pan/zoom and visibility culling |
//! | [`hit`] | Bounding boxes, point containment, resize-handle and element hit-testing |
//! | [`transform`] | Resize and translate |
//! | [`selection`] | Selection overlay description |
//! | [`consts`] | Shared numeric constants (handle radius, size floors, zoom limits, etc.) |

pub mod camera;
pub mod consts;
pub mod element;
pub mod hit;
pub mod selection;
pub mod transform;

pub use camera::{CanvasSize, Point, Viewport};
pub use element::DrawingElement;
pub use hit::{BoundingBox, ResizeHandle};

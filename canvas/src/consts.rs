//! Shared numeric constants for the canvas crate.

// ── Viewport ────────────────────────────────────────────────────

/// Screen pixels per world unit at `scale == 1.0`.
pub const PX_PER_WORLD_UNIT: f64 = 100.0;

/// Lower bound for the viewport zoom scale.
pub const MIN_SCALE: f64 = 0.2;

/// Upper bound for the viewport zoom scale.
pub const MAX_SCALE: f64 = 5.0;

/// Relative scale change applied per wheel zoom step.
pub const ZOOM_STEP: f64 = 0.1;

/// Extra screen margin around the canvas inside which boxes still count as visible.
pub const CULL_MARGIN_PX: f64 = 100.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space radius in pixels within which a corner handle is grabbed.
pub const HANDLE_RADIUS_PX: f64 = 10.0;

// ── Selection box ───────────────────────────────────────────────

/// Side length in pixels of the square corner handles drawn on a selection.
pub const HANDLE_SIZE_PX: f64 = 8.0;

/// Stroke color of the selection rectangle and handle outlines.
pub const SELECTION_STROKE: &str = "#3b82f6";

/// Fill color of the corner handles.
pub const HANDLE_FILL: &str = "#ffffff";

/// Line width in pixels of the selection rectangle and handle outlines.
pub const SELECTION_LINE_WIDTH_PX: f64 = 2.0;

/// Dash pattern (on, off) in pixels for the selection rectangle.
pub const SELECTION_DASH_PX: [f64; 2] = [5.0, 5.0];

// ── Resize limits ───────────────────────────────────────────────

/// Minimum width and height of a shape after a resize, in world units.
pub const MIN_SHAPE_SIZE: f64 = 10.0;

/// Minimum width and height of an image after a resize, in world units.
pub const MIN_IMAGE_SIZE: f64 = 20.0;

/// Smallest font size a text resize can produce.
pub const MIN_FONT_SIZE: f64 = 12.0;

/// Largest font size a text resize can produce.
pub const MAX_FONT_SIZE: f64 = 120.0;

// ── Text metrics heuristic ──────────────────────────────────────

/// Approximate glyph advance as a fraction of the font size.
pub const TEXT_CHAR_WIDTH_RATIO: f64 = 0.6;

/// Line height as a multiple of the font size.
pub const TEXT_LINE_HEIGHT_RATIO: f64 = 1.2;

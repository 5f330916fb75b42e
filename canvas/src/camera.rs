#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{CULL_MARGIN_PX, MAX_SCALE, MIN_SCALE, PX_PER_WORLD_UNIT, ZOOM_STEP};
use crate::hit::BoundingBox;

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Size of the drawing surface in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn center(self) -> Point {
        Point { x: self.width / 2.0, y: self.height / 2.0 }
    }
}

/// Per-client view of world space.
///
/// `x` / `y` is the world point shown at the canvas center.
/// `scale` is a zoom factor (1.0 = one world unit spans 100 pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, scale: 1.0 }
    }
}

impl Viewport {
    #[must_use]
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    fn px_per_unit(&self) -> f64 {
        self.scale * PX_PER_WORLD_UNIT
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point, canvas: CanvasSize) -> Point {
        let center = canvas.center();
        let k = self.px_per_unit();
        Point {
            x: (world.x - self.x) * k + center.x,
            y: (world.y - self.y) * k + center.y,
        }
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point, canvas: CanvasSize) -> Point {
        let center = canvas.center();
        let k = self.px_per_unit();
        Point {
            x: (screen.x - center.x) / k + self.x,
            y: (screen.y - center.y) / k + self.y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.px_per_unit()
    }

    /// Pan by a pointer drag of `(dx, dy)` screen pixels. Content follows the pointer.
    #[must_use]
    pub fn panned_by_drag(&self, dx: f64, dy: f64) -> Self {
        let k = self.px_per_unit();
        Self { x: self.x - dx / k, y: self.y - dy / k, scale: self.scale }
    }

    /// Pan by a two-finger wheel/trackpad delta. The view moves with the scroll.
    #[must_use]
    pub fn panned_by_wheel(&self, delta_x: f64, delta_y: f64) -> Self {
        let k = self.px_per_unit();
        Self { x: self.x + delta_x / k, y: self.y + delta_y / k, scale: self.scale }
    }

    /// Zoom one step around `cursor` (screen space), keeping the world point
    /// under the cursor fixed. Negative `delta_y` zooms in.
    #[must_use]
    pub fn zoomed_at(&self, delta_y: f64, cursor: Point, canvas: CanvasSize) -> Self {
        let factor = if -delta_y > 0.0 { 1.0 + ZOOM_STEP } else { 1.0 - ZOOM_STEP };
        let scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);

        let anchor = self.screen_to_world(cursor, canvas);
        let center = canvas.center();
        let k = scale * PX_PER_WORLD_UNIT;
        Self {
            x: anchor.x - (cursor.x - center.x) / k,
            y: anchor.y - (cursor.y - center.y) / k,
            scale,
        }
    }
}

/// Whether `bounds` (world space) overlaps the visible canvas grown by `margin` pixels.
#[must_use]
pub fn is_box_visible_with_margin(bounds: &BoundingBox, viewport: &Viewport, canvas: CanvasSize, margin: f64) -> bool {
    let top_left = viewport.world_to_screen(Point::new(bounds.x, bounds.y), canvas);
    let bottom_right = viewport.world_to_screen(Point::new(bounds.right(), bounds.bottom()), canvas);

    !(bottom_right.x < -margin
        || top_left.x > canvas.width + margin
        || bottom_right.y < -margin
        || top_left.y > canvas.height + margin)
}

/// [`is_box_visible_with_margin`] with the default cull margin.
#[must_use]
pub fn is_box_visible(bounds: &BoundingBox, viewport: &Viewport, canvas: CanvasSize) -> bool {
    is_box_visible_with_margin(bounds, viewport, canvas, CULL_MARGIN_PX)
}

//! Selection overlay description.
//!
//! Computes what a renderer must draw around a selected element: a dashed
//! rectangle at the projected bounding box and a square handle centred on
//! each corner. Drawing itself is left to the host.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use crate::camera::{CanvasSize, Point, Viewport};
use crate::consts::{HANDLE_FILL, HANDLE_SIZE_PX, SELECTION_DASH_PX, SELECTION_LINE_WIDTH_PX, SELECTION_STROKE};
use crate::hit::{BoundingBox, ResizeHandle};

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One corner handle of the selection overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleMarker {
    pub handle: ResizeHandle,
    /// Handle centre in screen pixels (the projected corner).
    pub center: Point,
    /// Square drawn for the handle.
    pub rect: ScreenRect,
}

/// Everything needed to draw a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionBox {
    pub screen_rect: ScreenRect,
    /// Handles in `nw, ne, sw, se` order.
    pub handles: [HandleMarker; 4],
    pub stroke: &'static str,
    pub line_width: f64,
    pub dash: [f64; 2],
    pub handle_fill: &'static str,
}

/// Describe the selection overlay for `bounds` under `viewport`.
#[must_use]
pub fn selection_box(bounds: &BoundingBox, viewport: &Viewport, canvas: CanvasSize) -> SelectionBox {
    let top_left = viewport.world_to_screen(bounds.corner(ResizeHandle::Nw), canvas);
    let bottom_right = viewport.world_to_screen(bounds.corner(ResizeHandle::Se), canvas);

    let marker = |handle: ResizeHandle| {
        let center = viewport.world_to_screen(bounds.corner(handle), canvas);
        let half = HANDLE_SIZE_PX / 2.0;
        HandleMarker {
            handle,
            center,
            rect: ScreenRect { x: center.x - half, y: center.y - half, width: HANDLE_SIZE_PX, height: HANDLE_SIZE_PX },
        }
    };

    SelectionBox {
        screen_rect: ScreenRect {
            x: top_left.x,
            y: top_left.y,
            width: bottom_right.x - top_left.x,
            height: bottom_right.y - top_left.y,
        },
        handles: ResizeHandle::ALL.map(marker),
        stroke: SELECTION_STROKE,
        line_width: SELECTION_LINE_WIDTH_PX,
        dash: SELECTION_DASH_PX,
        handle_fill: HANDLE_FILL,
    }
}

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{CanvasSize, Point, Viewport};
use crate::consts::{HANDLE_RADIUS_PX, TEXT_CHAR_WIDTH_RATIO, TEXT_LINE_HEIGHT_RATIO};
use crate::element::{DrawingElement, PathElement, ShapeElement, TextElement};

/// Axis-aligned rectangle in world coordinates. Derived from an element on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// World-space corner for a handle.
    #[must_use]
    pub fn corner(&self, handle: ResizeHandle) -> Point {
        match handle {
            ResizeHandle::Nw => Point::new(self.x, self.y),
            ResizeHandle::Ne => Point::new(self.right(), self.y),
            ResizeHandle::Sw => Point::new(self.x, self.bottom()),
            ResizeHandle::Se => Point::new(self.right(), self.bottom()),
        }
    }
}

/// Corner of a bounding box that can be dragged to resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl ResizeHandle {
    /// All handles in tie-break order.
    pub const ALL: [ResizeHandle; 4] = [Self::Nw, Self::Ne, Self::Sw, Self::Se];

    /// Lowercase label (`"nw"`, `"ne"`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nw => "nw",
            Self::Ne => "ne",
            Self::Sw => "sw",
            Self::Se => "se",
        }
    }
}

/// Bounding box of an element in world coordinates.
///
/// Returns `None` for `function` elements (selection is unsupported) and for
/// paths without points.
#[must_use]
pub fn bounding_box(element: &DrawingElement) -> Option<BoundingBox> {
    match element {
        DrawingElement::Path(path) => path_bounds(path),
        DrawingElement::Shape(shape) => Some(shape_bounds(shape)),
        DrawingElement::Text(text) => Some(text_bounds(text)),
        DrawingElement::Image(img) => Some(BoundingBox::new(img.x, img.y, img.width, img.height)),
        DrawingElement::Function(_) => None,
    }
}

/// Min/max over the points, grown by half the stroke width on every side.
fn path_bounds(path: &PathElement) -> Option<BoundingBox> {
    let first = path.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in path.points.iter().skip(1) {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let pad = path.width / 2.0;
    Some(BoundingBox::new(
        min_x - pad,
        min_y - pad,
        max_x - min_x + pad * 2.0,
        max_y - min_y + pad * 2.0,
    ))
}

pub(crate) fn shape_bounds(shape: &ShapeElement) -> BoundingBox {
    BoundingBox::new(
        shape.start_x.min(shape.end_x),
        shape.start_y.min(shape.end_y),
        (shape.end_x - shape.start_x).abs(),
        (shape.end_y - shape.start_y).abs(),
    )
}

/// Heuristic text box: `0.6 * font_size` per character of the longest line,
/// `1.2 * font_size` per line.
pub(crate) fn text_bounds(text: &TextElement) -> BoundingBox {
    let mut line_count = 0_usize;
    let mut longest = 1_usize;
    for line in text.text.split('\n') {
        line_count += 1;
        longest = longest.max(line.chars().count());
    }
    #[allow(clippy::cast_precision_loss)]
    let (longest, line_count) = (longest as f64, line_count as f64);
    BoundingBox::new(
        text.x,
        text.y,
        longest * text.font_size * TEXT_CHAR_WIDTH_RATIO,
        line_count * text.font_size * TEXT_LINE_HEIGHT_RATIO,
    )
}

/// Inclusive containment test on both axes.
#[must_use]
pub fn point_in_box(point: Point, bounds: &BoundingBox) -> bool {
    point.x >= bounds.x && point.x <= bounds.right() && point.y >= bounds.y && point.y <= bounds.bottom()
}

/// Which corner handle (if any) is under `screen_pt`.
///
/// Corners are projected to screen space through `viewport`; the nearest one
/// strictly closer than [`HANDLE_RADIUS_PX`] wins. Ties go to the earlier
/// handle in [`ResizeHandle::ALL`].
#[must_use]
pub fn resize_handle_at(
    screen_pt: Point,
    bounds: &BoundingBox,
    viewport: &Viewport,
    canvas: CanvasSize,
) -> Option<ResizeHandle> {
    let mut best: Option<(ResizeHandle, f64)> = None;
    for handle in ResizeHandle::ALL {
        let corner = viewport.world_to_screen(bounds.corner(handle), canvas);
        let dist = screen_pt.distance(corner);
        if dist >= HANDLE_RADIUS_PX {
            continue;
        }
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((handle, dist));
        }
    }
    best.map(|(handle, _)| handle)
}

/// Topmost element whose bounding box contains `world_pt`.
///
/// Elements later in the slice are drawn above earlier ones, so the scan runs
/// back to front.
#[must_use]
pub fn element_at(elements: &[DrawingElement], world_pt: Point) -> Option<&DrawingElement> {
    elements
        .iter()
        .rev()
        .find(|el| bounding_box(el).is_some_and(|b| point_in_box(world_pt, &b)))
}

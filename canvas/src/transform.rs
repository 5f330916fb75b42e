//! Element mutations driven by pointer drags: corner resize and translation.
//!
//! Both operations are pure. They return a new element with the same `id`;
//! a resize that would break a size floor returns the input unchanged.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use crate::consts::{MAX_FONT_SIZE, MIN_FONT_SIZE, MIN_IMAGE_SIZE, MIN_SHAPE_SIZE};
use crate::element::{DrawingElement, ImageElement, ShapeElement, TextElement};
use crate::hit::{ResizeHandle, shape_bounds, text_bounds};

/// Drag `handle` by `(dx, dy)` world units.
///
/// - `shape`: moves the matching edges of the normalized box; rejected below
///   [`MIN_SHAPE_SIZE`] on either axis.
/// - `image`: corner resize of the stored box; rejected below [`MIN_IMAGE_SIZE`].
/// - `text`: uniform scale of `font_size` by the larger axis ratio, clamped
///   to `[MIN_FONT_SIZE, MAX_FONT_SIZE]`.
/// - `path`, `function`: unchanged.
#[must_use]
pub fn apply_resize(element: &DrawingElement, handle: ResizeHandle, dx: f64, dy: f64) -> DrawingElement {
    let resized = match element {
        DrawingElement::Shape(shape) => resize_shape(shape, handle, dx, dy).map(DrawingElement::Shape),
        DrawingElement::Image(img) => resize_image(img, handle, dx, dy).map(DrawingElement::Image),
        DrawingElement::Text(text) => resize_text(text, handle, dx, dy).map(DrawingElement::Text),
        DrawingElement::Path(_) | DrawingElement::Function(_) => None,
    };
    resized.unwrap_or_else(|| element.clone())
}

fn resize_shape(shape: &ShapeElement, handle: ResizeHandle, dx: f64, dy: f64) -> Option<ShapeElement> {
    let b = shape_bounds(shape);
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (b.x, b.y, b.right(), b.bottom());

    match handle {
        ResizeHandle::Nw => {
            min_x += dx;
            min_y += dy;
        }
        ResizeHandle::Ne => {
            max_x += dx;
            min_y += dy;
        }
        ResizeHandle::Sw => {
            min_x += dx;
            max_y += dy;
        }
        ResizeHandle::Se => {
            max_x += dx;
            max_y += dy;
        }
    }

    if max_x - min_x < MIN_SHAPE_SIZE || max_y - min_y < MIN_SHAPE_SIZE {
        return None;
    }

    Some(ShapeElement { start_x: min_x, start_y: min_y, end_x: max_x, end_y: max_y, ..shape.clone() })
}

fn resize_image(img: &ImageElement, handle: ResizeHandle, dx: f64, dy: f64) -> Option<ImageElement> {
    let (mut x, mut y, mut width, mut height) = (img.x, img.y, img.width, img.height);

    match handle {
        ResizeHandle::Nw => {
            x += dx;
            y += dy;
            width -= dx;
            height -= dy;
        }
        ResizeHandle::Ne => {
            y += dy;
            width += dx;
            height -= dy;
        }
        ResizeHandle::Sw => {
            x += dx;
            width -= dx;
            height += dy;
        }
        ResizeHandle::Se => {
            width += dx;
            height += dy;
        }
    }

    if width < MIN_IMAGE_SIZE || height < MIN_IMAGE_SIZE {
        return None;
    }

    Some(ImageElement { x, y, width, height, ..img.clone() })
}

fn resize_text(text: &TextElement, handle: ResizeHandle, dx: f64, dy: f64) -> Option<TextElement> {
    let b = text_bounds(text);
    if b.width <= 0.0 || b.height <= 0.0 {
        return None;
    }

    let (grow_x, grow_y) = match handle {
        ResizeHandle::Se => (dx, dy),
        ResizeHandle::Ne => (dx, -dy),
        ResizeHandle::Sw => (-dx, dy),
        ResizeHandle::Nw => (-dx, -dy),
    };
    let scale = ((b.width + grow_x) / b.width).max((b.height + grow_y) / b.height);
    let font_size = (text.font_size * scale).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);

    Some(TextElement { font_size, ..text.clone() })
}

/// Shift an element by `(dx, dy)` world units.
///
/// Paths move every point, shapes both corners, text and images their
/// anchor. Function plots are not positioned and come back unchanged.
#[must_use]
pub fn translate_element(element: &DrawingElement, dx: f64, dy: f64) -> DrawingElement {
    let mut moved = element.clone();
    match &mut moved {
        DrawingElement::Path(path) => {
            for p in &mut path.points {
                p.x += dx;
                p.y += dy;
            }
        }
        DrawingElement::Shape(shape) => {
            shape.start_x += dx;
            shape.start_y += dy;
            shape.end_x += dx;
            shape.end_y += dy;
        }
        DrawingElement::Text(text) => {
            text.x += dx;
            text.y += dy;
        }
        DrawingElement::Image(img) => {
            img.x += dx;
            img.y += dy;
        }
        DrawingElement::Function(_) => {}
    }
    moved
}

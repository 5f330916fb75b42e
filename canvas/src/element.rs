//! Element model: the drawing elements that live on a whiteboard.
//!
//! `DrawingElement` is a tagged union over the five element kinds. It is the
//! unit that crosses the wire: the JSON form carries the variant in a `type`
//! field and uses camelCase field names, so payloads stay compatible with
//! browser clients. The geometry functions in [`crate::hit`] and
//! [`crate::transform`] take elements by reference and return new values; an
//! element's `id` never changes across those operations.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Generate a fresh element identifier.
#[must_use]
pub fn new_element_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A drawing element as stored by the board host and sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DrawingElement {
    /// Freehand pen stroke.
    Path(PathElement),
    /// Geometric shape spanned by two corner points.
    Shape(ShapeElement),
    /// Text block anchored at its top-left corner.
    Text(TextElement),
    /// Raster image with an explicit box.
    Image(ImageElement),
    /// Plotted mathematical function. Has no bounding box.
    Function(FunctionPlot),
}

impl DrawingElement {
    /// Unique identifier, stable for the element's lifetime.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Path(e) => &e.id,
            Self::Shape(e) => &e.id,
            Self::Text(e) => &e.id,
            Self::Image(e) => &e.id,
            Self::Function(e) => &e.id,
        }
    }

    /// Wire name of the variant (`"path"`, `"shape"`, ...).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Shape(_) => "shape",
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Function(_) => "function",
        }
    }
}

/// Freehand stroke through a sequence of world-space points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathElement {
    pub id: String,
    pub points: Vec<Point>,
    pub color: String,
    /// Stroke width in world units.
    pub width: f64,
    /// Per-point widths for pressure-sensitive strokes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widths: Option<Vec<f64>>,
    /// Opacity in `[0, 1]`; absent means fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Kind of geometric shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Line,
    Arrow,
    Polygon,
}

/// Shape spanned by two free-form corners. The corners may be in any diagonal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeElement {
    pub id: String,
    pub shape_type: ShapeKind,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub color: String,
    pub stroke_width: f64,
    pub fill: bool,
    /// Number of sides for polygons (3+).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<u32>,
    /// Rotation in radians.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Text block. Lines are separated by `\n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Layout box width set by the editor, if any. Not used for hit-testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub text: String,
    pub font_size: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Image with an explicit world-space box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// URL or data URI.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Plot of `y = f(x)` over the visible range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionPlot {
    pub id: String,
    pub expression: String,
    pub color: String,
    pub stroke_width: f64,
    pub x_range: f64,
    pub y_range: f64,
    /// SVG-style dash pattern, e.g. `"5 5"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
}

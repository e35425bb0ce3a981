//! Rendered components: the disposable visual projection of a layout pass.

use serde::{Deserialize, Serialize};

/// Pixel metrics of the rendered columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub column_width: i32,
    pub row_height: i32,
    pub spacing: i32,
    pub padding: i32,
    pub label_height: i32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            column_width: 120,
            row_height: 24,
            spacing: 4,
            padding: 6,
            label_height: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.bottom() <= self.bottom()
    }
}

/// One interval or group as drawn in the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedComponent {
    /// Bound box.
    pub rectangle1: Rect,
    /// Label box.
    pub rectangle2: Rect,
    /// 0 for intervals or values, then one per grouping level.
    pub depth: usize,
    /// Global element index on its level; repetitions continue the count.
    pub index: i64,
    /// False for cyclic repetitions of the declared pattern.
    pub enabled: bool,
    pub label: String,
    pub bounds: String,
    pub min: String,
    pub max: String,
}

/// Cardinalities and components of one layout pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub cardinalities: Vec<usize>,
    pub pretty: bool,
    pub components: Vec<RenderedComponent>,
}

impl Layout {
    /// Components on one column.
    pub fn column(&self, depth: usize) -> impl Iterator<Item = &RenderedComponent> {
        self.components.iter().filter(move |c| c.depth == depth)
    }

    /// Overall width and height in pixels.
    pub fn extent(&self) -> (i32, i32) {
        self.components.iter().fold((0, 0), |(w, h), c| {
            (
                w.max(c.rectangle1.x + c.rectangle1.width),
                h.max(c.rectangle1.bottom()),
            )
        })
    }
}

/// Place one component.
///
/// `rows` is the half-open row span the element covers. Degenerate spans
/// still receive a full row so that nothing renders with zero size.
pub(crate) fn place(geometry: &Geometry, depth: usize, rows: (i64, i64)) -> (Rect, Rect) {
    let (start, end) = rows;
    let span = (end - start).max(1) as i32;
    let x = depth as i32 * (geometry.column_width + geometry.spacing);
    let y = start as i32 * geometry.row_height;
    let height = (span * geometry.row_height - geometry.spacing).max(1);
    let bound = Rect::new(x, y, geometry.column_width, height);

    let label_width = (geometry.column_width - 2 * geometry.padding).max(1);
    let label_height = geometry.label_height.min(height).max(1);
    let label_y = y + ((height - label_height) / 2).max(0);
    let label = Rect::new(x + geometry.padding, label_y, label_width, label_height);
    (bound, label)
}

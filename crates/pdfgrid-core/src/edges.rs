//! Ruling edges derived from Line and Rect primitives.
//!
//! Only axis-aligned segments take part in table grid detection. Edges use
//! the centreline of a stroke, not its painted thickness.

use crate::shapes::{Line, LineOrientation, Rect};

/// Axis of a ruling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Which primitive an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSource {
    Line,
    RectTop,
    RectBottom,
    RectLeft,
    RectRight,
}

/// An axis-aligned segment used as table ruling.
///
/// Horizontal edges have `top == bottom`; vertical edges have `x0 == x1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub orientation: Orientation,
    pub source: EdgeSource,
}

impl Edge {
    pub fn horizontal(x0: f64, x1: f64, y: f64, source: EdgeSource) -> Self {
        Self {
            x0: x0.min(x1),
            top: y,
            x1: x0.max(x1),
            bottom: y,
            orientation: Orientation::Horizontal,
            source,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64, source: EdgeSource) -> Self {
        Self {
            x0: x,
            top: top.min(bottom),
            x1: x,
            bottom: top.max(bottom),
            orientation: Orientation::Vertical,
            source,
        }
    }

    /// Length along the edge's own axis.
    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }
}

/// Edge for an axis-aligned line, `None` for diagonals.
pub fn edge_from_line(line: &Line) -> Option<Edge> {
    match line.orientation {
        LineOrientation::Horizontal => Some(Edge::horizontal(
            line.start.x,
            line.end.x,
            line.start.y,
            EdgeSource::Line,
        )),
        LineOrientation::Vertical => Some(Edge::vertical(
            line.start.x,
            line.start.y,
            line.end.y,
            EdgeSource::Line,
        )),
        LineOrientation::Diagonal => None,
    }
}

/// The four sides of a rectangle.
pub fn edges_from_rect(rect: &Rect) -> [Edge; 4] {
    let b = rect.bbox;
    [
        Edge::horizontal(b.x0, b.x1, b.top, EdgeSource::RectTop),
        Edge::horizontal(b.x0, b.x1, b.bottom, EdgeSource::RectBottom),
        Edge::vertical(b.x0, b.top, b.bottom, EdgeSource::RectLeft),
        Edge::vertical(b.x1, b.top, b.bottom, EdgeSource::RectRight),
    ]
}

/// Collect ruling edges at least `min_length` long from lines and rects.
pub fn derive_edges<'a, L, R>(lines: L, rects: R, min_length: f64) -> Vec<Edge>
where
    L: IntoIterator<Item = &'a Line>,
    R: IntoIterator<Item = &'a Rect>,
{
    lines
        .into_iter()
        .filter_map(edge_from_line)
        .chain(rects.into_iter().flat_map(edges_from_rect))
        .filter(|e| e.length() >= min_length)
        .collect()
}

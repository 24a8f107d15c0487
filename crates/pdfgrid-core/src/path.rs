//! Path construction and painting.
//!
//! The builder stores points already mapped through its matrix, which the
//! interpreter composes with the page flip, so painted paths are in top-left
//! page space.

use crate::geometry::{Ctm, Point};

/// A segment of a PDF path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Move to a new point (starts a new subpath).
    MoveTo(Point),
    /// Straight line from current point to target.
    LineTo(Point),
    /// Cubic Bezier curve with two control points and an endpoint.
    CurveTo { cp1: Point, cp2: Point, end: Point },
    /// Close the current subpath (line back to the subpath start).
    ClosePath,
}

/// A complete path consisting of segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

/// How a path was painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintStyle {
    pub stroke: bool,
    pub fill: bool,
    /// Stroke width in page units at paint time.
    pub line_width: f64,
}

/// A path together with the painting operator applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    pub path: Path,
    pub style: PaintStyle,
}

/// Builder for constructing paths from PDF path operators.
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
    current_point: Option<Point>,
    subpath_start: Option<Point>,
    ctm: Ctm,
}

impl PathBuilder {
    pub fn new(ctm: Ctm) -> Self {
        Self {
            ctm,
            ..Self::default()
        }
    }

    /// Path construction uses the matrix in force when each operator runs.
    pub fn set_ctm(&mut self, ctm: Ctm) {
        self.ctm = ctm;
    }

    fn map(&self, x: f64, y: f64) -> Point {
        let (tx, ty) = self.ctm.transform(x, y);
        Point::new(tx, ty)
    }

    /// `m` operator.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.map(x, y);
        self.segments.push(PathSegment::MoveTo(p));
        self.current_point = Some(p);
        self.subpath_start = Some(p);
    }

    /// `l` operator. Without a current point it behaves like `m`.
    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.current_point.is_none() {
            self.move_to(x, y);
            return;
        }
        let p = self.map(x, y);
        self.segments.push(PathSegment::LineTo(p));
        self.current_point = Some(p);
    }

    /// `c` operator.
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        let cp1 = self.map(x1, y1);
        let cp2 = self.map(x2, y2);
        let end = self.map(x3, y3);
        self.segments.push(PathSegment::CurveTo { cp1, cp2, end });
        self.current_point = Some(end);
    }

    /// `v` operator: first control point is the current point.
    pub fn curve_to_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) {
        let Some(cp1) = self.current_point else {
            return;
        };
        let cp2 = self.map(x2, y2);
        let end = self.map(x3, y3);
        self.segments.push(PathSegment::CurveTo { cp1, cp2, end });
        self.current_point = Some(end);
    }

    /// `y` operator: last control point is the endpoint.
    pub fn curve_to_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) {
        let cp1 = self.map(x1, y1);
        let end = self.map(x3, y3);
        self.segments.push(PathSegment::CurveTo { cp1, cp2: end, end });
        self.current_point = Some(end);
    }

    /// `h` operator.
    pub fn close_path(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        self.segments.push(PathSegment::ClosePath);
        self.current_point = self.subpath_start;
    }

    /// `re` operator: moveto + 3 lineto + closepath.
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Finish the current path with a painting operator and reset.
    ///
    /// Returns `None` for an empty path or for `n` (neither stroked nor filled).
    pub fn paint(&mut self, stroke: bool, fill: bool, line_width: f64) -> Option<PaintedPath> {
        let segments = std::mem::take(&mut self.segments);
        self.current_point = None;
        self.subpath_start = None;
        if segments.is_empty() || !(stroke || fill) {
            return None;
        }
        Some(PaintedPath {
            path: Path { segments },
            style: PaintStyle {
                stroke,
                fill,
                line_width,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_emits_five_segments() {
        let mut b = PathBuilder::new(Ctm::identity());
        b.rectangle(10.0, 20.0, 30.0, 40.0);
        let painted = b.paint(true, false, 1.0).unwrap();
        assert_eq!(painted.path.segments.len(), 5);
        assert_eq!(
            painted.path.segments[2],
            PathSegment::LineTo(Point::new(40.0, 60.0))
        );
        assert!(b.is_empty());
    }

    #[test]
    fn points_are_transformed_at_construction() {
        let flip = Ctm::new(1.0, 0.0, 0.0, -1.0, 0.0, 792.0);
        let mut b = PathBuilder::new(flip);
        b.move_to(50.0, 692.0);
        b.line_to(350.0, 692.0);
        let painted = b.paint(true, false, 1.0).unwrap();
        assert_eq!(
            painted.path.segments[0],
            PathSegment::MoveTo(Point::new(50.0, 100.0))
        );
    }

    #[test]
    fn end_path_discards() {
        let mut b = PathBuilder::new(Ctm::identity());
        b.move_to(0.0, 0.0);
        b.line_to(10.0, 0.0);
        assert!(b.paint(false, false, 1.0).is_none());
        assert!(b.is_empty());
    }

    #[test]
    fn curve_v_needs_current_point() {
        let mut b = PathBuilder::new(Ctm::identity());
        b.curve_to_v(1.0, 1.0, 2.0, 2.0);
        assert!(b.is_empty());
    }
}

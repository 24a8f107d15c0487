//! Line, Rect and Curve extraction from painted paths.
//!
//! Paths arrive in top-left page space. Every shape carries a non-empty
//! bounding box: flat extents are inflated by half the stroke width.

use crate::geometry::{BBox, Point};
use crate::path::{PaintStyle, PaintedPath, PathSegment};
use crate::primitive::Primitive;

/// Smallest extent a shape bbox is allowed to have on either axis.
pub const MIN_EXTENT: f64 = 0.5;

/// Tolerance for deciding that a segment is axis-aligned.
const AXIS_TOLERANCE: f64 = 1e-6;

/// Orientation of a line segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineOrientation {
    Horizontal,
    Vertical,
    Diagonal,
}

/// A straight line segment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line {
    /// Painted area including the stroke thickness.
    pub bbox: BBox,
    /// Centreline start point.
    pub start: Point,
    /// Centreline end point.
    pub end: Point,
    pub line_width: f64,
    pub orientation: LineOrientation,
    pub stroke: bool,
    pub fill: bool,
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub bbox: BBox,
    pub line_width: f64,
    pub stroke: bool,
    pub fill: bool,
}

/// A subpath containing Bezier segments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Curve {
    /// Box over every vertex and control point.
    pub bbox: BBox,
    /// Vertices and control points in drawing order.
    pub points: Vec<Point>,
    pub line_width: f64,
    pub stroke: bool,
    pub fill: bool,
}

fn classify_orientation(a: Point, b: Point) -> LineOrientation {
    if (b.y - a.y).abs() < AXIS_TOLERANCE {
        LineOrientation::Horizontal
    } else if (b.x - a.x).abs() < AXIS_TOLERANCE {
        LineOrientation::Vertical
    } else {
        LineOrientation::Diagonal
    }
}

fn make_line(start: Point, end: Point, style: &PaintStyle) -> Line {
    let orientation = classify_orientation(start, end);
    let half = (style.line_width / 2.0).max(MIN_EXTENT / 2.0);
    let raw = BBox::from_points(start, end);
    let bbox = match orientation {
        LineOrientation::Horizontal => raw.expand(0.0, half),
        LineOrientation::Vertical => raw.expand(half, 0.0),
        LineOrientation::Diagonal => raw,
    }
    .ensure_extent(MIN_EXTENT);
    Line {
        bbox,
        start,
        end,
        line_width: style.line_width,
        orientation,
        stroke: style.stroke,
        fill: style.fill,
    }
}

/// Split segments into subpaths, each starting at a MoveTo.
fn subpaths(segments: &[PathSegment]) -> Vec<&[PathSegment]> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, seg) in segments.iter().enumerate() {
        if i > start && matches!(seg, PathSegment::MoveTo(_)) {
            out.push(&segments[start..i]);
            start = i;
        }
    }
    if start < segments.len() {
        out.push(&segments[start..]);
    }
    out
}

fn same_point(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < AXIS_TOLERANCE && (a.y - b.y).abs() < AXIS_TOLERANCE
}

fn is_closed(subpath: &[PathSegment], vertices: &[Point]) -> bool {
    subpath.iter().any(|s| matches!(s, PathSegment::ClosePath))
        || (vertices.len() >= 2 && same_point(vertices[0], vertices[vertices.len() - 1]))
}

/// Axis-aligned rectangle formed by four vertices, if any.
fn detect_rect(vertices: &[Point]) -> Option<BBox> {
    if vertices.len() != 4 {
        return None;
    }
    for i in 0..4 {
        let a = vertices[i];
        let b = vertices[(i + 1) % 4];
        if (b.x - a.x).abs() > AXIS_TOLERANCE && (b.y - a.y).abs() > AXIS_TOLERANCE {
            return None;
        }
    }
    let xs = vertices.iter().map(|p| p.x);
    let ys = vertices.iter().map(|p| p.y);
    Some(BBox::new(
        xs.clone().fold(f64::INFINITY, f64::min),
        ys.clone().fold(f64::INFINITY, f64::min),
        xs.fold(f64::NEG_INFINITY, f64::max),
        ys.fold(f64::NEG_INFINITY, f64::max),
    ))
}

/// Straight segments of a subpath, including the implicit closing segment.
fn straight_segments(subpath: &[PathSegment]) -> Vec<(Point, Point)> {
    let mut out = Vec::new();
    let mut start: Option<Point> = None;
    let mut current: Option<Point> = None;
    for seg in subpath {
        match seg {
            PathSegment::MoveTo(p) => {
                start = Some(*p);
                current = Some(*p);
            }
            PathSegment::LineTo(p) => {
                if let Some(c) = current {
                    out.push((c, *p));
                }
                current = Some(*p);
            }
            PathSegment::CurveTo { end, .. } => current = Some(*end),
            PathSegment::ClosePath => {
                if let (Some(c), Some(s)) = (current, start) {
                    if !same_point(c, s) {
                        out.push((c, s));
                    }
                }
                current = start;
            }
        }
    }
    out
}

/// Convert a painted path into shape primitives.
///
/// - closed axis-aligned four-vertex subpaths become [`Rect`]s, or a [`Line`]
///   when one side collapses to zero
/// - subpaths with Bezier segments become a single [`Curve`]
/// - remaining straight segments become [`Line`]s when the path is stroked
pub fn extract_shapes(painted: &PaintedPath) -> Vec<Primitive> {
    let style = &painted.style;
    let mut out = Vec::new();

    for subpath in subpaths(&painted.path.segments) {
        let has_curve = subpath
            .iter()
            .any(|s| matches!(s, PathSegment::CurveTo { .. }));
        if has_curve {
            let points: Vec<Point> = subpath
                .iter()
                .flat_map(|seg| match seg {
                    PathSegment::MoveTo(p) | PathSegment::LineTo(p) => vec![*p],
                    PathSegment::CurveTo { cp1, cp2, end } => vec![*cp1, *cp2, *end],
                    PathSegment::ClosePath => Vec::new(),
                })
                .collect();
            let Some(bbox) = BBox::union_all(points.iter().map(|p| BBox::from_points(*p, *p)))
            else {
                continue;
            };
            out.push(Primitive::Curve(Curve {
                bbox: bbox.ensure_extent(MIN_EXTENT),
                points,
                line_width: style.line_width,
                stroke: style.stroke,
                fill: style.fill,
            }));
            continue;
        }

        let vertices: Vec<Point> = subpath
            .iter()
            .filter_map(|seg| match seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => Some(*p),
                _ => None,
            })
            .collect();
        // A rectangle drawn with an explicit return to its start has five vertices.
        let corners = if vertices.len() == 5 && same_point(vertices[0], vertices[4]) {
            &vertices[..4]
        } else {
            &vertices[..]
        };
        if is_closed(subpath, &vertices) {
            if let Some(bbox) = detect_rect(corners) {
                let flat_w = bbox.width() < AXIS_TOLERANCE;
                let flat_h = bbox.height() < AXIS_TOLERANCE;
                if flat_w || flat_h {
                    let (start, end) = if flat_h {
                        (Point::new(bbox.x0, bbox.top), Point::new(bbox.x1, bbox.top))
                    } else {
                        (Point::new(bbox.x0, bbox.top), Point::new(bbox.x0, bbox.bottom))
                    };
                    out.push(Primitive::Line(make_line(start, end, style)));
                } else {
                    out.push(Primitive::Rect(Rect {
                        bbox,
                        line_width: style.line_width,
                        stroke: style.stroke,
                        fill: style.fill,
                    }));
                }
                continue;
            }
        }

        if !style.stroke {
            continue;
        }
        for (a, b) in straight_segments(subpath) {
            if same_point(a, b) {
                continue;
            }
            out.push(Primitive::Line(make_line(a, b, style)));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Ctm;
    use crate::path::PathBuilder;

    fn stroked(build: impl FnOnce(&mut PathBuilder)) -> PaintedPath {
        let mut b = PathBuilder::new(Ctm::identity());
        build(&mut b);
        b.paint(true, false, 1.0).unwrap()
    }

    #[test]
    fn rectangle_operator_yields_rect() {
        let shapes = extract_shapes(&stroked(|b| b.rectangle(50.0, 100.0, 300.0, 60.0)));
        assert_eq!(shapes.len(), 1);
        match &shapes[0] {
            Primitive::Rect(r) => assert_eq!(r.bbox, BBox::new(50.0, 100.0, 350.0, 160.0)),
            other => panic!("expected rect, got {other:?}"),
        }
    }

    #[test]
    fn horizontal_line_gets_thickness() {
        let shapes = extract_shapes(&stroked(|b| {
            b.move_to(50.0, 100.0);
            b.line_to(350.0, 100.0);
        }));
        let Primitive::Line(line) = &shapes[0] else {
            panic!("expected line");
        };
        assert_eq!(line.orientation, LineOrientation::Horizontal);
        assert_eq!(line.bbox, BBox::new(50.0, 99.5, 350.0, 100.5));
        assert!(!line.bbox.is_empty());
    }

    #[test]
    fn zero_height_filled_rect_becomes_line() {
        let mut b = PathBuilder::new(Ctm::identity());
        b.rectangle(10.0, 10.0, 100.0, 0.0);
        let painted = b.paint(false, true, 0.0).unwrap();
        let shapes = extract_shapes(&painted);
        assert_eq!(shapes.len(), 1);
        let Primitive::Line(line) = &shapes[0] else {
            panic!("expected line");
        };
        assert!(line.fill);
        assert!(line.bbox.height() >= MIN_EXTENT);
    }

    #[test]
    fn polyline_splits_into_segments() {
        let shapes = extract_shapes(&stroked(|b| {
            b.move_to(0.0, 0.0);
            b.line_to(10.0, 0.0);
            b.line_to(10.0, 10.0);
        }));
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().all(|s| matches!(s, Primitive::Line(_))));
    }

    #[test]
    fn bezier_subpath_is_one_curve() {
        let shapes = extract_shapes(&stroked(|b| {
            b.move_to(0.0, 0.0);
            b.curve_to(5.0, 10.0, 15.0, 10.0, 20.0, 0.0);
        }));
        assert_eq!(shapes.len(), 1);
        let Primitive::Curve(curve) = &shapes[0] else {
            panic!("expected curve");
        };
        assert_eq!(curve.points.len(), 4);
        assert_eq!(curve.bbox, BBox::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn fill_only_open_path_produces_nothing() {
        let mut b = PathBuilder::new(Ctm::identity());
        b.move_to(0.0, 0.0);
        b.line_to(10.0, 5.0);
        let painted = b.paint(false, true, 1.0).unwrap();
        assert!(extract_shapes(&painted).is_empty());
    }
}

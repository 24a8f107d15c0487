/// Bounding box with top-left origin coordinate system.
///
/// Units are PDF points and y grows downward:
/// - `x0`: left edge
/// - `top`: top edge (distance from top of page)
/// - `x1`: right edge
/// - `bottom`: bottom edge (distance from top of page)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Smallest box containing both corner points, in any order.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// True when the box has no area.
    pub fn is_empty(&self) -> bool {
        !(self.x1 > self.x0 && self.bottom > self.top)
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Compute the union of two bounding boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Union of an iterator of boxes, `None` when the iterator is empty.
    pub fn union_all<I: IntoIterator<Item = BBox>>(boxes: I) -> Option<BBox> {
        boxes.into_iter().reduce(|a, b| a.union(&b))
    }

    /// Grow each side by `dx` horizontally and `dy` vertically.
    pub fn expand(&self, dx: f64, dy: f64) -> BBox {
        BBox::new(self.x0 - dx, self.top - dy, self.x1 + dx, self.bottom + dy)
    }

    /// Widen degenerate extents so the box always has area.
    ///
    /// Each collapsed axis is grown symmetrically to `min_extent`.
    pub fn ensure_extent(&self, min_extent: f64) -> BBox {
        let mut out = *self;
        if out.width() < min_extent {
            let pad = (min_extent - out.width()) / 2.0;
            out.x0 -= pad;
            out.x1 += pad;
        }
        if out.height() < min_extent {
            let pad = (min_extent - out.height()) / 2.0;
            out.top -= pad;
            out.bottom += pad;
        }
        out
    }

    /// Whether `other` lies inside this box, allowing `slack` on every side.
    pub fn contains(&self, other: &BBox, slack: f64) -> bool {
        other.x0 >= self.x0 - slack
            && other.top >= self.top - slack
            && other.x1 <= self.x1 + slack
            && other.bottom <= self.bottom + slack
    }

    /// Whether the point lies inside this box (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.top && y <= self.bottom
    }

    /// Length of the shared horizontal extent, 0 when disjoint.
    pub fn horizontal_overlap(&self, other: &BBox) -> f64 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Whether the vertical extents intersect with positive length.
    pub fn overlaps_vertically(&self, other: &BBox) -> bool {
        self.bottom.min(other.bottom) > self.top.max(other.top)
    }
}

/// A point in top-left page space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Affine transformation matrix `[a b c d e f]` in PDF operand order.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ctm {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Ctm {
    fn default() -> Self {
        Self::identity()
    }
}

impl Ctm {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn from_array(m: [f64; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    /// Apply the transformation to a point.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// `self` applied first, then `other` (PDF `cm` concatenation order).
    pub fn concat(&self, other: &Ctm) -> Ctm {
        Ctm {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Length a unit vector along x is scaled to.
    pub fn x_scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length a unit vector along y is scaled to.
    pub fn y_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

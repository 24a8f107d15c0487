use crate::geometry::BBox;
use crate::shapes::{Curve, Line, Rect};
use crate::text::Char;

/// A single positioned element from a page's content stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "lowercase")
)]
pub enum Primitive {
    Char(Char),
    Line(Line),
    Rect(Rect),
    Curve(Curve),
}

impl Primitive {
    /// Bounding box in top-left page space. Never empty.
    pub fn bbox(&self) -> BBox {
        match self {
            Primitive::Char(c) => c.bbox,
            Primitive::Line(l) => l.bbox,
            Primitive::Rect(r) => r.bbox,
            Primitive::Curve(c) => c.bbox,
        }
    }
}

/// One interpreted page: its size and every primitive in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 0-based page index.
    pub index: usize,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    pub primitives: Vec<Primitive>,
}

impl Page {
    pub fn new(index: usize, width: f64, height: f64) -> Self {
        Self {
            index,
            width,
            height,
            primitives: Vec::new(),
        }
    }

    /// Characters in emission order.
    pub fn chars(&self) -> Vec<Char> {
        self.primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Char(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Line(l) => Some(l),
            _ => None,
        })
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Rect(r) => Some(r),
            _ => None,
        })
    }

    /// A page with nothing drawn on it.
    pub fn is_blank(&self) -> bool {
        self.primitives.is_empty()
    }
}

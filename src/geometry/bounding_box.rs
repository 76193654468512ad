use std::fmt;

use geo::{BoundingRect, Coord, Geometry, Polygon, Rect};

use crate::types::Value;

/// Rectangular extent; the empty box has no coordinates at all.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    rect: Option<Rect<f64>>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Corners may be given in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::from_rect(Rect::new(Coord { x: x1, y: y1 }, Coord { x: x2, y: y2 }))
    }

    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self { rect: Some(rect) }
    }

    pub fn from_geometry(geometry: &Geometry<f64>) -> Self {
        Self {
            rect: geometry.bounding_rect(),
        }
    }

    /// Extent of a geometry or box value; anything else is empty.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Geometry(geometry) => Self::from_geometry(geometry),
            Value::BoundingBox(bbox) => *bbox,
            _ => Self::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_none()
    }

    pub fn rect(&self) -> Option<Rect<f64>> {
        self.rect
    }

    pub fn min_x(&self) -> Option<f64> {
        self.rect.map(|r| r.min().x)
    }

    pub fn min_y(&self) -> Option<f64> {
        self.rect.map(|r| r.min().y)
    }

    pub fn max_x(&self) -> Option<f64> {
        self.rect.map(|r| r.max().x)
    }

    pub fn max_y(&self) -> Option<f64> {
        self.rect.map(|r| r.max().y)
    }

    /// Grows this box to cover `other`.
    pub fn add_bbox(&mut self, other: &BoundingBox) {
        self.rect = match (self.rect, other.rect) {
            (Some(a), Some(b)) => Some(Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )),
            (a, b) => a.or(b),
        };
    }

    pub fn expand_delta(&self, delta: f64) -> Self {
        match self.rect {
            Some(r) => Self::new(
                r.min().x - delta,
                r.min().y - delta,
                r.max().x + delta,
                r.max().y + delta,
            ),
            None => *self,
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        match (self.rect, other.rect) {
            (Some(a), Some(b)) => {
                a.min().x <= b.max().x
                    && b.min().x <= a.max().x
                    && a.min().y <= b.max().y
                    && b.min().y <= a.max().y
            }
            _ => false,
        }
    }

    /// Euclidean gap between the two extents, zero when they intersect.
    pub fn distance(&self, other: &BoundingBox) -> Option<f64> {
        let (a, b) = (self.rect?, other.rect?);
        let dx = (a.min().x - b.max().x).max(b.min().x - a.max().x).max(0.0);
        let dy = (a.min().y - b.max().y).max(b.min().y - a.max().y).max(0.0);
        Some(dx.hypot(dy))
    }

    pub fn to_polygon(&self) -> Option<Polygon<f64>> {
        self.rect.map(|r| r.to_polygon())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rect {
            Some(r) => write!(
                f,
                "BBOX({} {},{} {})",
                r.min().x,
                r.min().y,
                r.max().x,
                r.max().y
            ),
            None => write!(f, "BBOX EMPTY"),
        }
    }
}

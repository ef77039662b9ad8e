//! Geometry primitives in PDF user space (origin bottom-left, y up).

use serde::{Deserialize, Serialize};

/// An affine transform `[a b c d e f]` as used by `cm` and `Tm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit vertical, i.e. the effective font scale.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// An axis-aligned rectangle. `y1` is the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a box from two corners in any order.
    pub fn new(xa: f32, ya: f32, xb: f32, yb: f32) -> Self {
        Self {
            x0: xa.min(xb),
            y0: ya.min(yb),
            x1: xa.max(xb),
            y1: ya.max(yb),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Orientation of a ruling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling segment, from a stroked line or a rectangle side.
///
/// Horizontal edges span `start..end` in x at height `pos`; vertical edges
/// span `start..end` in y at abscissa `pos`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub pos: f32,
    pub start: f32,
    pub end: f32,
}

impl Edge {
    pub fn horizontal(y: f32, xa: f32, xb: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            pos: y,
            start: xa.min(xb),
            end: xa.max(xb),
        }
    }

    pub fn vertical(x: f32, ya: f32, yb: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            pos: x,
            start: ya.min(yb),
            end: ya.max(yb),
        }
    }

    /// Build an edge from a segment if it is axis-aligned within `tolerance`.
    pub fn from_segment(p: (f32, f32), q: (f32, f32), tolerance: f32) -> Option<Self> {
        if (p.1 - q.1).abs() <= tolerance {
            Some(Self::horizontal((p.1 + q.1) / 2.0, p.0, q.0))
        } else if (p.0 - q.0).abs() <= tolerance {
            Some(Self::vertical((p.0 + q.0) / 2.0, p.1, q.1))
        } else {
            None
        }
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }
}

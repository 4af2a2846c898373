//! Geometry
//!
//! DOMRect in page or viewport coordinates.

/// DOMRect - rectangle geometry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    /// Create with dimensions
    pub const fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Zero-area rects never intersect anything
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Same rect moved by `(dx, dy)`
    pub fn translate(&self, dx: f64, dy: f64) -> DOMRect {
        DOMRect::from_xywh(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow (or shrink, with negative values) each edge independently
    pub fn inflate(&self, top: f64, right: f64, bottom: f64, left: f64) -> DOMRect {
        DOMRect::from_xywh(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }

    /// Intersection rect, `None` when the rects do not overlap
    pub fn intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(DOMRect::from_xywh(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Edge-inclusive intersection. Touching rects yield a zero-area rect,
    /// which is how a zero-area target inside the root is detected.
    pub fn edge_intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right >= x && bottom >= y {
            Some(DOMRect::from_xywh(x, y, right - x, bottom - y))
        } else {
            None
        }
    }
}

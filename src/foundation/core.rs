pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Coordinates are clamped to this magnitude when rounding float rects outwards so that
/// widths and areas never overflow `i32`/`u64` arithmetic.
const COORD_LIMIT: f64 = (1 << 28) as f64;

/// Integer device-space rectangle, half-open: `[x0, x1) x [y0, y1)`.
///
/// A value of this type is never empty; "no area" is spelled `Option::<IntRect>::None`, which
/// mirrors how the drawing tree treats missing boxes (nothing to draw, nothing to cache).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct IntRect {
    /// Inclusive left edge.
    pub x0: i32,
    /// Inclusive top edge.
    pub y0: i32,
    /// Exclusive right edge.
    pub x1: i32,
    /// Exclusive bottom edge.
    pub y1: i32,
}

impl IntRect {
    /// Create a rectangle from its edges, or `None` when it has no area.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Option<Self> {
        (x1 > x0 && y1 > y0).then_some(Self { x0, y0, x1, y1 })
    }

    /// Create a rectangle from origin and size, or `None` when it has no area.
    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Option<Self> {
        Self::new(x, y, x.saturating_add(w), y.saturating_add(h))
    }

    /// Smallest integer rectangle containing `r`.
    pub fn round_out(r: Rect) -> Option<Self> {
        if !(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()) {
            return None;
        }
        let r = r.abs();
        let clamp = |v: f64| v.clamp(-COORD_LIMIT, COORD_LIMIT);
        Self::new(
            clamp(r.x0.floor()) as i32,
            clamp(r.y0.floor()) as i32,
            clamp(r.x1.ceil()) as i32,
            clamp(r.y1.ceil()) as i32,
        )
    }

    /// Width in pixels.
    pub fn width(self) -> i32 {
        self.x1 - self.x0
    }

    /// Height in pixels.
    pub fn height(self) -> i32 {
        self.y1 - self.y0
    }

    /// Number of pixels covered.
    pub fn area(self) -> u64 {
        (self.width() as u64) * (self.height() as u64)
    }

    /// Top-left corner.
    pub fn min(self) -> (i32, i32) {
        (self.x0, self.y0)
    }

    /// Overlap of two rectangles.
    pub fn intersect(self, other: Self) -> Option<Self> {
        Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        )
    }

    /// Return `true` when the rectangles share at least one pixel.
    pub fn intersects(self, other: Self) -> bool {
        self.intersect(other).is_some()
    }

    /// Smallest rectangle containing both.
    pub fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow (or shrink, for negative `d`) every edge by `d` pixels.
    pub fn expand_by(self, d: i32) -> Option<Self> {
        Self::new(
            self.x0.saturating_sub(d),
            self.y0.saturating_sub(d),
            self.x1.saturating_add(d),
            self.y1.saturating_add(d),
        )
    }

    /// Return `true` when `other` lies entirely inside `self`.
    pub fn contains_rect(self, other: Self) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }

    /// Return `true` when pixel `(x, y)` is inside.
    pub fn contains_pixel(self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Shift by an integer offset.
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// Float rectangle with the same edges.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }
}

/// Union where either side may be absent.
pub fn union_opt(a: Option<IntRect>, b: Option<IntRect>) -> Option<IntRect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Intersection where either side may be absent (absent means empty).
pub fn intersect_opt(a: Option<IntRect>, b: Option<IntRect>) -> Option<IntRect> {
    a?.intersect(b?)
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Channels in `[r, g, b, a]` order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

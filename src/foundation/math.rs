use crate::foundation::core::Affine;

/// Transforms whose determinant magnitude is below this are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-18;

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Premultiply one straight channel by `alpha`.
pub(crate) fn premul_alpha(c: u8, alpha: u8) -> u8 {
    mul_div255_u8(u16::from(c), u16::from(alpha))
}

/// Undo premultiplication of one channel; zero alpha yields zero.
pub(crate) fn unpremul_alpha(c: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let v = (u32::from(c) * 255 + u32::from(alpha) / 2) / u32::from(alpha);
    v.min(255) as u8
}

/// Round a channel value and clamp it into `0..=255`.
pub(crate) fn clamp_d_to_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Return `true` when `a` collapses area (cannot be inverted reliably).
pub fn is_singular(a: Affine, eps: f64) -> bool {
    let det = a.determinant();
    !det.is_finite() || det.abs() < eps
}

/// Geometric mean scale factor of an affine (square root of the absolute determinant).
pub fn descrim(a: Affine) -> f64 {
    a.determinant().abs().sqrt()
}

/// sRGB transfer function inverse, on a `[0,1]` component.
pub fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Small 3-component vector used by the lighting kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Unit vector pointing at the viewer.
    pub const EYE: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    /// Construct from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Scalar product.
    pub fn dot(self, o: Self) -> f64 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; zero stays zero.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return self;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }

    /// Normalized sum of two vectors (the half-way vector for specular terms).
    pub fn normalized_sum(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z).normalized()
    }

    /// `self - o`.
    pub fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }

    /// Multiply every component by `k`.
    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;

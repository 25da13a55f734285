use crate::foundation::math::{clamp_d_to_u8, premul_alpha, unpremul_alpha};

/// 4x5 colour matrix applied to unpremultiplied RGBA.
///
/// Rows produce R, G, B and A; the fifth column is an offset in `[0, 1]` channel units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorMatrix(pub [f64; 20]);

impl ColorMatrix {
    /// Leaves every pixel unchanged.
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// Luminance matrix used by the grayscale colour mode.
    pub const GRAYSCALE: ColorMatrix = ColorMatrix([
        0.21, 0.72, 0.072, 0.0, 0.0, //
        0.21, 0.72, 0.072, 0.0, 0.0, //
        0.21, 0.72, 0.072, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// SVG `feColorMatrix type="saturate"`.
    pub fn saturate(s: f64) -> Self {
        let s = s.clamp(0.0, 1.0);
        ColorMatrix([
            0.213 + 0.787 * s,
            0.715 - 0.715 * s,
            0.072 - 0.072 * s,
            0.0,
            0.0,
            0.213 - 0.213 * s,
            0.715 + 0.285 * s,
            0.072 - 0.072 * s,
            0.0,
            0.0,
            0.213 - 0.213 * s,
            0.715 - 0.715 * s,
            0.072 + 0.928 * s,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
        ])
    }

    /// Apply to one premultiplied pixel.
    pub fn apply_premul(&self, px: [u8; 4]) -> [u8; 4] {
        let a = px[3];
        let src = [
            f64::from(unpremul_alpha(px[0], a)),
            f64::from(unpremul_alpha(px[1], a)),
            f64::from(unpremul_alpha(px[2], a)),
            f64::from(a),
        ];
        let m = &self.0;
        let mut out = [0u8; 4];
        for (row, o) in out.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            let v = r[0] * src[0] + r[1] * src[1] + r[2] * src[2] + r[3] * src[3] + r[4] * 255.0;
            *o = clamp_d_to_u8(v);
        }
        let na = out[3];
        [
            premul_alpha(out[0], na),
            premul_alpha(out[1], na),
            premul_alpha(out[2], na),
            na,
        ]
    }

    /// Apply to a premultiplied RGBA8 buffer in place.
    pub fn apply_in_place(&self, rgba8_premul: &mut [u8]) {
        for px in rgba8_premul.chunks_exact_mut(4) {
            let out = self.apply_premul([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        }
    }

    /// Return `true` when the alpha row maps alpha onto itself.
    pub fn preserves_alpha(&self) -> bool {
        self.0[15..20] == [0.0, 0.0, 0.0, 1.0, 0.0]
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/color_matrix.rs"]
mod tests;

use crate::effects::light::{
    ColorInterpolation, LightSource, PositionedLight, distant_light_vector, light_components,
};
use crate::foundation::core::{Affine, IntRect};
use crate::foundation::error::DrawResult;
use crate::foundation::math::{Vec3, clamp_d_to_u8, descrim, premul_alpha};
use crate::render::surface::Surface;

/// Scheduling cost of either lighting primitive, whatever the light type.
pub const LIGHTING_COMPLEXITY: f64 = 9.0;

/// `feDiffuseLighting`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DiffuseLighting {
    /// Height of the bump map at alpha 1.
    pub surface_scale: f64,
    /// `kd`.
    pub diffuse_constant: f64,
    /// sRGB lighting colour.
    pub lighting_color: [u8; 3],
    /// Light; `None` paints opaque black.
    pub light: Option<LightSource>,
    /// Space the lighting colour is used in.
    pub color_interpolation: ColorInterpolation,
}

impl Default for DiffuseLighting {
    fn default() -> Self {
        Self {
            surface_scale: 1.0,
            diffuse_constant: 1.0,
            lighting_color: [255, 255, 255],
            light: None,
            color_interpolation: ColorInterpolation::default(),
        }
    }
}

/// `feSpecularLighting`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SpecularLighting {
    /// Height of the bump map at alpha 1.
    pub surface_scale: f64,
    /// `ks`.
    pub specular_constant: f64,
    /// Shininess, clamped to `[1, 128]`.
    pub specular_exponent: f64,
    /// sRGB lighting colour.
    pub lighting_color: [u8; 3],
    /// Light; `None` paints opaque black.
    pub light: Option<LightSource>,
    /// Space the lighting colour is used in.
    pub color_interpolation: ColorInterpolation,
}

impl Default for SpecularLighting {
    fn default() -> Self {
        Self {
            surface_scale: 1.0,
            specular_constant: 1.0,
            specular_exponent: 1.0,
            lighting_color: [255, 255, 255],
            light: None,
            color_interpolation: ColorInterpolation::default(),
        }
    }
}

/// Grow a lighting result area by the one pixel the normal kernel reads past each edge.
///
/// Pixels on the outer edge of the grown area are still approximate.
pub fn lighting_area_enlarge(area: IntRect) -> IntRect {
    area.expand_by(1).unwrap_or(area)
}

/// Height field taken from the alpha channel of a premultiplied surface.
pub struct BumpMap<'a> {
    data: &'a [u8],
    width: i32,
    height: i32,
}

impl<'a> BumpMap<'a> {
    /// View the alpha channel of `surface`.
    pub fn new(surface: &'a Surface) -> Self {
        Self {
            data: surface.data(),
            width: surface.width() as i32,
            height: surface.height() as i32,
        }
    }

    /// Alpha at local pixel `(x, y)` in `0..=255`.
    pub fn alpha_at(&self, x: i32, y: i32) -> f64 {
        f64::from(self.data[((y * self.width + x) as usize) * 4 + 3])
    }

    /// Sobel derivative along X (or Y when `vertical`), in alpha units per pixel.
    ///
    /// Rows (columns) outside the map drop out of the 1-2-1 weighting and edge columns
    /// (rows) fall back to a one-sided difference; the result is normalised by the weights
    /// actually used, which reproduces the edge factors of the SVG lighting model.
    fn gradient(&self, x: i32, y: i32, vertical: bool) -> f64 {
        let (pos, len, cross, cross_len) = if vertical {
            (y, self.height, x, self.width)
        } else {
            (x, self.width, y, self.height)
        };
        let lo = if pos > 0 { pos - 1 } else { pos };
        let hi = if pos < len - 1 { pos + 1 } else { pos };
        if lo == hi {
            return 0.0;
        }
        let sample = |along: i32, across: i32| {
            if vertical {
                self.alpha_at(across, along)
            } else {
                self.alpha_at(along, across)
            }
        };

        let mut sum = 0.0;
        let mut weights = 0.0;
        for (d, w) in [(-1, 1.0), (0, 2.0), (1, 1.0)] {
            let c = cross + d;
            if c < 0 || c >= cross_len {
                continue;
            }
            sum += w * (sample(hi, c) - sample(lo, c));
            weights += w;
        }
        sum * 2.0 / (weights * f64::from(hi - lo))
    }

    /// Unit surface normal at local pixel `(x, y)` for a height scale.
    pub fn surface_normal(&self, x: i32, y: i32, scale: f64) -> Vec3 {
        let nx = -scale * self.gradient(x, y, false) / 255.0;
        let ny = -scale * self.gradient(x, y, true) / 255.0;
        Vec3::new(nx, ny, 1.0).normalized()
    }
}

enum ResolvedLight {
    Distant { vector: Vec3, color: Vec3 },
    Positioned(PositionedLight),
}

impl ResolvedLight {
    fn resolve(
        light: &LightSource,
        color: Vec3,
        trans: Affine,
        device_scale: f64,
    ) -> ResolvedLight {
        match *light {
            LightSource::Distant { azimuth, elevation } => ResolvedLight::Distant {
                vector: distant_light_vector(azimuth, elevation),
                color,
            },
            LightSource::Point { x, y, z } => ResolvedLight::Positioned(PositionedLight::point(
                x,
                y,
                z,
                color,
                trans,
                device_scale,
            )),
            LightSource::Spot {
                x,
                y,
                z,
                points_at_x,
                points_at_y,
                points_at_z,
                specular_exponent,
                limiting_cone_angle,
            } => ResolvedLight::Positioned(PositionedLight::spot(
                (x, y, z),
                (points_at_x, points_at_y, points_at_z),
                specular_exponent,
                limiting_cone_angle,
                color,
                trans,
                device_scale,
            )),
        }
    }

    /// Light vector and colour reaching surface pixel `(px, py)` at height `z`.
    fn at(&self, px: f64, py: f64, z: f64) -> (Vec3, Vec3) {
        match self {
            ResolvedLight::Distant { vector, color } => (*vector, *color),
            ResolvedLight::Positioned(light) => {
                let l = light.light_vector(px, py, z);
                (l, light.components(l))
            }
        }
    }
}

/// Run `kernel` for every pixel of `input`, giving it the normal, light vector and colour.
#[allow(clippy::too_many_arguments)]
fn synthesize<F>(
    input: &Surface,
    light: Option<&LightSource>,
    rgb: [u8; 3],
    space: ColorInterpolation,
    surface_scale: f64,
    trans: Affine,
    device_scale: f64,
    kernel: F,
) -> DrawResult<Surface>
where
    F: Fn(Vec3, Vec3, Vec3) -> [u8; 4],
{
    let mut out = Surface::new(input.rect())?;
    let Some(light) = light else {
        for px in out.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
        return Ok(out);
    };

    let scale = surface_scale * descrim(trans) * device_scale;
    let resolved = ResolvedLight::resolve(light, light_components(rgb, space), trans, device_scale);
    let bump = BumpMap::new(input);
    let (x0, y0) = input.rect().min();
    let width = input.width() as i32;
    let height = input.height() as i32;

    let data = out.data_mut();
    for y in 0..height {
        for x in 0..width {
            let normal = bump.surface_normal(x, y, scale);
            let z = scale * bump.alpha_at(x, y) / 255.0;
            let (l, color) = resolved.at(f64::from(x0 + x), f64::from(y0 + y), z);
            let i = ((y * width + x) as usize) * 4;
            data[i..i + 4].copy_from_slice(&kernel(normal, l, color));
        }
    }
    Ok(out)
}

impl DiffuseLighting {
    /// Light the alpha bump map of `input`.
    ///
    /// `trans` maps primitive units to the pixel grid of `input`; `device_scale` is the
    /// extra HiDPI factor applied on top of it.
    pub fn render(&self, input: &Surface, trans: Affine, device_scale: f64) -> DrawResult<Surface> {
        let kd = self.diffuse_constant;
        synthesize(
            input,
            self.light.as_ref(),
            self.lighting_color,
            self.color_interpolation,
            self.surface_scale,
            trans,
            device_scale,
            |normal, light, color| {
                let k = kd * normal.dot(light);
                [
                    clamp_d_to_u8(k * color.x),
                    clamp_d_to_u8(k * color.y),
                    clamp_d_to_u8(k * color.z),
                    255,
                ]
            },
        )
    }
}

impl SpecularLighting {
    /// Light the alpha bump map of `input`; the result is premultiplied.
    pub fn render(&self, input: &Surface, trans: Affine, device_scale: f64) -> DrawResult<Surface> {
        let ks = self.specular_constant;
        let exponent = self.specular_exponent.clamp(1.0, 128.0);
        synthesize(
            input,
            self.light.as_ref(),
            self.lighting_color,
            self.color_interpolation,
            self.surface_scale,
            trans,
            device_scale,
            |normal, light, color| {
                let halfway = light.normalized_sum(Vec3::EYE);
                let sp = normal.dot(halfway);
                let k = if sp <= 0.0 { 0.0 } else { ks * sp.powf(exponent) };
                let r = clamp_d_to_u8(k * color.x);
                let g = clamp_d_to_u8(k * color.y);
                let b = clamp_d_to_u8(k * color.z);
                let a = r.max(g).max(b);
                [
                    premul_alpha(r, a),
                    premul_alpha(g, a),
                    premul_alpha(b, a),
                    a,
                ]
            },
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/lighting.rs"]
mod tests;

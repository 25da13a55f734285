use crate::foundation::core::{Affine, Point};
use crate::foundation::math::{Vec3, descrim, srgb_to_linear};

/// Light descriptor of a lighting primitive, in primitive units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightSource {
    /// Infinitely distant directional light; angles in degrees.
    Distant {
        /// Direction angle on the XY plane.
        azimuth: f64,
        /// Angle above the XY plane.
        elevation: f64,
    },
    /// Omnidirectional light at a position.
    Point {
        /// Position.
        x: f64,
        /// Position.
        y: f64,
        /// Height above the surface.
        z: f64,
    },
    /// Cone-shaped light pointing at a target.
    Spot {
        /// Position.
        x: f64,
        /// Position.
        y: f64,
        /// Height above the surface.
        z: f64,
        /// Target point.
        points_at_x: f64,
        /// Target point.
        points_at_y: f64,
        /// Target point.
        points_at_z: f64,
        /// Focus of the cone.
        specular_exponent: f64,
        /// Half-angle of the cone in degrees; `None` means unbounded.
        limiting_cone_angle: Option<f64>,
    },
}

/// Colour interpolation space of a filter primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorInterpolation {
    /// Work directly on sRGB values.
    #[default]
    Srgb,
    /// Work on linearised values.
    LinearRgb,
}

/// Lighting colour as `0..=255` doubles, linearised when the primitive works in linearRGB.
pub fn light_components(rgb: [u8; 3], space: ColorInterpolation) -> Vec3 {
    let conv = |c: u8| {
        let v = f64::from(c) / 255.0;
        let v = match space {
            ColorInterpolation::Srgb => v,
            ColorInterpolation::LinearRgb => srgb_to_linear(v),
        };
        // Round back to an 8-bit colour the way the packed lighting colour is.
        (v * 255.0).round()
    };
    Vec3::new(conv(rgb[0]), conv(rgb[1]), conv(rgb[2]))
}

/// Unit vector pointing from the surface toward a distant light.
pub fn distant_light_vector(azimuth_deg: f64, elevation_deg: f64) -> Vec3 {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();
    Vec3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin())
}

/// A point or spot light resolved into pixel-buffer space.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PositionedLight {
    pos: Vec3,
    spot: Option<SpotCone>,
    color: Vec3,
}

#[derive(Clone, Copy, Debug)]
struct SpotCone {
    direction: Vec3,
    specular_exponent: f64,
    cos_limit: f64,
}

impl PositionedLight {
    fn place(x: f64, y: f64, z: f64, trans: Affine, device_scale: f64) -> Vec3 {
        // `trans` may flip an axis, so x/y go through the full transform while z only
        // takes its scale factor.
        let p = trans * Point::new(x, y);
        Vec3::new(
            p.x * device_scale,
            p.y * device_scale,
            z * descrim(trans) * device_scale,
        )
    }

    /// Resolve a point light.
    pub(crate) fn point(
        x: f64,
        y: f64,
        z: f64,
        color: Vec3,
        trans: Affine,
        device_scale: f64,
    ) -> Self {
        Self {
            pos: Self::place(x, y, z, trans, device_scale),
            spot: None,
            color,
        }
    }

    /// Resolve a spot light.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn spot(
        from: (f64, f64, f64),
        to: (f64, f64, f64),
        specular_exponent: f64,
        limiting_cone_angle: Option<f64>,
        color: Vec3,
        trans: Affine,
        device_scale: f64,
    ) -> Self {
        let pos = Self::place(from.0, from.1, from.2, trans, device_scale);
        let target = Self::place(to.0, to.1, to.2, trans, device_scale);
        let cos_limit = match limiting_cone_angle {
            Some(deg) => deg.abs().min(90.0).to_radians().cos(),
            None => -1.0,
        };
        Self {
            pos,
            spot: Some(SpotCone {
                direction: target.sub(pos).normalized(),
                specular_exponent,
                cos_limit,
            }),
            color,
        }
    }

    /// Unit vector from surface point `(x, y, z)` toward the light.
    pub(crate) fn light_vector(&self, x: f64, y: f64, z: f64) -> Vec3 {
        self.pos.sub(Vec3::new(x, y, z)).normalized()
    }

    /// Light colour reaching the surface along `light` (spot cones attenuate it).
    pub(crate) fn components(&self, light: Vec3) -> Vec3 {
        let Some(cone) = self.spot else {
            return self.color;
        };
        let cos_angle = -light.dot(cone.direction);
        if cos_angle <= cone.cos_limit || cos_angle <= 0.0 {
            return Vec3::default();
        }
        self.color.scale(cos_angle.powf(cone.specular_exponent))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/light.rs"]
mod tests;

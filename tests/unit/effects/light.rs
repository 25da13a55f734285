use super::*;

#[test]
fn overhead_distant_light_points_up() {
    let l = distant_light_vector(0.0, 90.0);
    assert!(l.x.abs() < 1e-12);
    assert!(l.y.abs() < 1e-12);
    assert_eq!(l.z, 1.0);
}

#[test]
fn linearisation_darkens_midtones() {
    let srgb = light_components([128, 255, 0], ColorInterpolation::Srgb);
    let lin = light_components([128, 255, 0], ColorInterpolation::LinearRgb);
    assert_eq!(srgb, Vec3::new(128.0, 255.0, 0.0));
    assert_eq!(lin.x, 55.0);
    assert_eq!(lin.y, 255.0);
    assert_eq!(lin.z, 0.0);
}

#[test]
fn point_light_position_follows_transform() {
    let trans = Affine::translate((10.0, 0.0)) * Affine::scale(2.0);
    let light = PositionedLight::point(1.0, 1.0, 5.0, Vec3::new(255.0, 255.0, 255.0), trans, 1.0);
    let v = light.light_vector(12.0, 2.0, 0.0);
    assert!(v.x.abs() < 1e-12);
    assert!(v.y.abs() < 1e-12);
    assert!((v.z - 1.0).abs() < 1e-12);
}

#[test]
fn spot_light_is_dark_outside_its_cone() {
    let white = Vec3::new(255.0, 255.0, 255.0);
    let spot = PositionedLight::spot(
        (0.0, 0.0, 10.0),
        (0.0, 0.0, 0.0),
        1.0,
        Some(10.0),
        white,
        Affine::IDENTITY,
        1.0,
    );
    let under = spot.light_vector(0.0, 0.0, 0.0);
    assert_eq!(spot.components(under), white);
    let far = spot.light_vector(100.0, 0.0, 0.0);
    assert_eq!(spot.components(far), Vec3::default());
}

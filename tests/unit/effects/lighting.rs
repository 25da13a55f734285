use super::*;

fn flat(alpha: u8, w: i32, h: i32) -> Surface {
    let rect = IntRect::new(0, 0, w, h).unwrap();
    let bytes = [0, 0, 0, alpha].repeat((w * h) as usize);
    Surface::from_premul_rgba8(rect, &bytes).unwrap()
}

fn overhead() -> Option<LightSource> {
    Some(LightSource::Distant {
        azimuth: 0.0,
        elevation: 90.0,
    })
}

#[test]
fn flat_map_has_upright_normals() {
    let s = flat(200, 3, 3);
    let bump = BumpMap::new(&s);
    for (x, y) in [(0, 0), (1, 1), (2, 1)] {
        let n = bump.surface_normal(x, y, 5.0);
        assert_eq!(n.z, 1.0);
        assert_eq!(n.x, 0.0);
    }
}

#[test]
fn ramp_gradient_matches_sobel_factors() {
    // alpha = 10 * x across 3 columns
    let rect = IntRect::new(0, 0, 3, 3).unwrap();
    let mut bytes = Vec::new();
    for _y in 0..3 {
        for x in 0..3u8 {
            bytes.extend_from_slice(&[0, 0, 0, 10 * x]);
        }
    }
    let s = Surface::from_premul_rgba8(rect, &bytes).unwrap();
    let bump = BumpMap::new(&s);
    // interior: 1/4 * (1+2+1) * 20 = 20 ; edge: 1/2 * 4 * 10 = 20
    assert!((bump.gradient(1, 1, false) - 20.0).abs() < 1e-12);
    assert!((bump.gradient(0, 1, false) - 20.0).abs() < 1e-12);
    assert!((bump.gradient(2, 0, false) - 20.0).abs() < 1e-12);
    assert_eq!(bump.gradient(1, 1, true), 0.0);
}

#[test]
fn diffuse_flat_overhead_is_kd_times_color() {
    let s = flat(255, 4, 4);
    let prim = DiffuseLighting {
        diffuse_constant: 0.5,
        lighting_color: [200, 100, 40],
        light: overhead(),
        ..DiffuseLighting::default()
    };
    let out = prim.render(&s, Affine::IDENTITY, 1.0).unwrap();
    for px in out.data().chunks_exact(4) {
        assert_eq!(px, [100, 50, 20, 255]);
    }
}

#[test]
fn missing_light_paints_opaque_black() {
    let s = flat(10, 2, 2);
    let out = SpecularLighting::default()
        .render(&s, Affine::IDENTITY, 1.0)
        .unwrap();
    for px in out.data().chunks_exact(4) {
        assert_eq!(px, [0, 0, 0, 255]);
    }
}

#[test]
fn specular_output_is_premultiplied_by_max_channel() {
    let s = flat(0, 2, 2);
    let prim = SpecularLighting {
        lighting_color: [255, 128, 0],
        light: overhead(),
        ..SpecularLighting::default()
    };
    let out = prim.render(&s, Affine::IDENTITY, 1.0).unwrap();
    for px in out.data().chunks_exact(4) {
        assert_eq!(px[3], 255);
        assert_eq!(px[0], 255);
        assert_eq!(px[1], 128);
        assert_eq!(px[2], 0);
    }
}

#[test]
fn point_light_overhead_of_pixel_lights_it_fully() {
    let s = flat(0, 3, 3);
    let prim = DiffuseLighting {
        lighting_color: [255, 255, 255],
        light: Some(LightSource::Point {
            x: 1.0,
            y: 1.0,
            z: 2.0,
        }),
        ..DiffuseLighting::default()
    };
    let out = prim.render(&s, Affine::IDENTITY, 1.0).unwrap();
    assert_eq!(out.pixel(1, 1), Some([255, 255, 255, 255]));
    let corner = out.pixel(0, 0).unwrap();
    assert!(corner[0] < 255);
}

#[test]
fn enlarge_adds_one_pixel_border() {
    let r = IntRect::new(0, 0, 4, 4).unwrap();
    assert_eq!(lighting_area_enlarge(r), IntRect::new(-1, -1, 5, 5).unwrap());
    assert_eq!(LIGHTING_COMPLEXITY, 9.0);
}

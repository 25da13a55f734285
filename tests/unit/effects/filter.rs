use super::*;
use crate::effects::light::LightSource;

fn overhead_diffuse() -> FilterPrimitive {
    FilterPrimitive::new(PrimitiveOp::DiffuseLighting(DiffuseLighting {
        lighting_color: [10, 20, 30],
        light: Some(LightSource::Distant {
            azimuth: 0.0,
            elevation: 90.0,
        }),
        ..DiffuseLighting::default()
    }))
}

#[test]
fn default_region_is_bbox_plus_ten_percent() {
    let bbox = Rect::new(0.0, 0.0, 100.0, 50.0);
    let r = FilterRegion::default().resolve(Some(bbox)).unwrap();
    assert!((r.x0 + 10.0).abs() < 1e-9);
    assert!((r.y0 + 5.0).abs() < 1e-9);
    assert!((r.x1 - 110.0).abs() < 1e-9);
    assert!((r.y1 - 55.0).abs() < 1e-9);
    assert!(FilterRegion::default().resolve(None).is_none());
}

#[test]
fn complexity_and_enlargement_accumulate() {
    let f = Filter::new(vec![
        overhead_diffuse(),
        FilterPrimitive::new(PrimitiveOp::ColorMatrix(ColorMatrix::GRAYSCALE)),
    ]);
    assert_eq!(f.complexity(Affine::IDENTITY), 10.0);
    let area = IntRect::new(0, 0, 16, 16).unwrap();
    assert_eq!(
        f.area_enlarge(area, Affine::IDENTITY),
        IntRect::new(-1, -1, 17, 17).unwrap()
    );
}

#[test]
fn lighting_output_is_cropped_to_region() {
    let f = Filter {
        region: FilterRegion {
            units: FilterUnits::UserSpaceOnUse,
            x: 2.0,
            y: 2.0,
            width: 4.0,
            height: 4.0,
        },
        ..Filter::new(vec![overhead_diffuse().with_input(FilterInput::SourceAlpha)])
    };
    let source = Surface::new(IntRect::new(0, 0, 8, 8).unwrap()).unwrap();
    let out = f
        .render(&source, None, Affine::IDENTITY, Quality::Best, Quality::Best)
        .unwrap();
    assert_eq!(out.rect(), source.rect());
    assert_eq!(out.pixel(3, 3), Some([10, 20, 30, 255]));
    assert_eq!(out.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(out.pixel(6, 6), Some([0, 0, 0, 0]));
}

#[test]
fn forward_result_reference_is_rejected() {
    let f = Filter {
        region: FilterRegion {
            units: FilterUnits::UserSpaceOnUse,
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 4.0,
        },
        ..Filter::new(vec![overhead_diffuse().with_input(FilterInput::Result(3))])
    };
    let source = Surface::new(IntRect::new(0, 0, 4, 4).unwrap()).unwrap();
    let err = f
        .render(&source, None, Affine::IDENTITY, Quality::Best, Quality::Best)
        .unwrap_err();
    assert!(err.to_string().contains("result 3"));
}

#[test]
fn reduced_quality_keeps_the_output_rect() {
    let f = Filter {
        region: FilterRegion {
            units: FilterUnits::UserSpaceOnUse,
            x: 0.0,
            y: 0.0,
            width: 9.0,
            height: 9.0,
        },
        ..Filter::new(vec![overhead_diffuse()])
    };
    let source = Surface::new(IntRect::new(1, 1, 9, 9).unwrap()).unwrap();
    let out = f
        .render(&source, None, Affine::IDENTITY, Quality::Worst, Quality::Best)
        .unwrap();
    assert_eq!(out.rect(), source.rect());
    assert_eq!(out.pixel(5, 5), Some([10, 20, 30, 255]));
}

#[test]
fn empty_chain_paints_nothing() {
    let f = Filter::default();
    let mut source = Surface::new(IntRect::new(0, 0, 2, 2).unwrap()).unwrap();
    source.set_pixel(0, 0, [255, 255, 255, 255]);
    let out = f
        .render(&source, None, Affine::IDENTITY, Quality::Best, Quality::Best)
        .unwrap();
    assert!(out.data().iter().all(|&b| b == 0));
}

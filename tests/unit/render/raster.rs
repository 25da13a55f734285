use super::*;

fn area(x0: i32, y0: i32, x1: i32, y1: i32) -> IntRect {
    IntRect::new(x0, y0, x1, y1).unwrap()
}

#[test]
fn pixel_aligned_rect_has_full_coverage_inside_only() {
    let path = rect_path(Rect::new(2.0, 2.0, 6.0, 6.0));
    let mask = coverage_mask(area(0, 0, 8, 8), &path, Affine::IDENTITY, FillRule::NonZero, true)
        .unwrap();
    assert_eq!(mask.len(), 64);
    assert_eq!(mask[3 * 8 + 3], 255);
    assert_eq!(mask[0], 0);
    assert_eq!(mask[7 * 8 + 7], 0);
}

#[test]
fn mask_origin_follows_area() {
    let path = rect_path(Rect::new(10.0, 10.0, 11.0, 11.0));
    let mask = coverage_mask(area(10, 10, 12, 12), &path, Affine::IDENTITY, FillRule::NonZero, true)
        .unwrap();
    assert_eq!(mask, vec![255, 0, 0, 0]);
}

#[test]
fn even_odd_leaves_nested_hole() {
    let mut path = rect_path(Rect::new(0.0, 0.0, 8.0, 8.0));
    path.extend(rect_path(Rect::new(2.0, 2.0, 6.0, 6.0)));
    let nz = coverage_mask(area(0, 0, 8, 8), &path, Affine::IDENTITY, FillRule::NonZero, true)
        .unwrap();
    let eo = coverage_mask(area(0, 0, 8, 8), &path, Affine::IDENTITY, FillRule::EvenOdd, true)
        .unwrap();
    assert_eq!(nz[4 * 8 + 4], 255);
    assert_eq!(eo[4 * 8 + 4], 0);
    assert_eq!(eo[0], 255);
}

#[test]
fn aliased_coverage_is_binary() {
    let path = rect_path(Rect::new(0.5, 0.5, 3.3, 3.7));
    let mask = coverage_mask(area(0, 0, 4, 4), &path, Affine::IDENTITY, FillRule::NonZero, false)
        .unwrap();
    assert!(mask.iter().all(|&m| m == 0 || m == 255));
}

#[test]
fn fill_path_paints_premultiplied_colour() {
    let mut target = Surface::new(area(0, 0, 4, 4)).unwrap();
    let path = rect_path(Rect::new(0.0, 0.0, 4.0, 4.0));
    fill_path(
        &mut target,
        area(0, 0, 2, 4),
        &path,
        Affine::IDENTITY,
        FillRule::NonZero,
        [255, 0, 0, 128],
        true,
    )
    .unwrap();
    assert_eq!(target.pixel(1, 1), Some([128, 0, 0, 128]));
    assert_eq!(target.pixel(3, 1), Some([0, 0, 0, 0]));
}

#[test]
fn hairline_marks_the_outline() {
    let mut target = Surface::new(area(0, 0, 10, 10)).unwrap();
    let path = rect_path(Rect::new(2.0, 2.0, 8.0, 8.0));
    let rect = target.rect();
    hairline(&mut target, rect, &path, Affine::IDENTITY, [0, 0, 0, 255]).unwrap();
    assert!(target.pixel(2, 5).unwrap()[3] > 0);
    assert_eq!(target.pixel(5, 5), Some([0, 0, 0, 0]));
}

#[test]
fn image_is_placed_by_transform() {
    let pixmap = Arc::new(premul_bytes_to_pixmap(&[0, 0, 255, 255], 1, 1).unwrap());
    let mut target = Surface::new(area(0, 0, 4, 4)).unwrap();
    let placement = Affine::scale(2.0);
    let rect = target.rect();
    draw_image(&mut target, rect, &pixmap, placement, Affine::translate((2.0, 2.0))).unwrap();
    let inside = target.pixel(3, 3).unwrap();
    assert!(inside[2] >= 250 && inside[3] >= 250, "{inside:?}");
    assert_eq!(inside[0], 0);
    assert_eq!(target.pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn fill_rule_winding_helper() {
    assert!(FillRule::NonZero.contains(2));
    assert!(!FillRule::EvenOdd.contains(2));
    assert!(FillRule::EvenOdd.contains(-1));
}

use super::*;
use crate::render::raster::{fill_path, rect_path};

fn area(x0: i32, y0: i32, x1: i32, y1: i32) -> IntRect {
    IntRect::new(x0, y0, x1, y1).unwrap()
}

fn paint_red(s: &mut Surface, a: IntRect) -> DrawResult<()> {
    fill_path(
        s,
        a,
        &rect_path(Rect::new(0.0, 0.0, 8.0, 8.0)),
        Affine::IDENTITY,
        FillRule::NonZero,
        [255, 0, 0, 255],
        true,
    )
}

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_dst_transparent_returns_src() {
    let dst = [0, 0, 0, 0];
    let src = [100, 110, 120, 200];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_in_place_rejects_mismatched_buffers() {
    let mut dst = [0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
}

#[test]
fn over_surface_only_touches_the_overlap() {
    let mut dst = Surface::new(area(0, 0, 4, 4)).unwrap();
    let src = Surface::from_premul_rgba8(area(2, 2, 6, 6), &[0, 255, 0, 255].repeat(16)).unwrap();
    over_surface(&mut dst, &src, area(0, 0, 10, 10), 1.0);
    assert_eq!(dst.pixel(3, 3), Some([0, 255, 0, 255]));
    assert_eq!(dst.pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn plain_layer_draws_directly() {
    let mut dst = Surface::new(area(0, 0, 4, 4)).unwrap();
    render_layered(&mut dst, area(0, 0, 2, 2), &LayerSpec::plain(), paint_red).unwrap();
    assert_eq!(dst.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(dst.pixel(3, 3), Some([0, 0, 0, 0]));
}

#[test]
fn opacity_layer_scales_the_result() {
    let mut dst = Surface::new(area(0, 0, 4, 4)).unwrap();
    let spec = LayerSpec {
        opacity: 0.5,
        ..LayerSpec::plain()
    };
    let rect = dst.rect();
    render_layered(&mut dst, rect, &spec, paint_red).unwrap();
    assert_eq!(dst.pixel(1, 1), Some([128, 0, 0, 128]));
}

#[test]
fn clip_layer_masks_outside_pixels() {
    let mut dst = Surface::new(area(0, 0, 4, 4)).unwrap();
    let clip = rect_path(Rect::new(0.0, 0.0, 2.0, 4.0));
    let spec = LayerSpec {
        clip: Some((&clip, Affine::IDENTITY)),
        ..LayerSpec::plain()
    };
    let rect = dst.rect();
    render_layered(&mut dst, rect, &spec, paint_red).unwrap();
    assert_eq!(dst.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(dst.pixel(3, 1), Some([0, 0, 0, 0]));
}

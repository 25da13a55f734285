use super::*;

#[test]
fn identity_keeps_opaque_pixels() {
    let px = [12, 200, 99, 255];
    assert_eq!(ColorMatrix::IDENTITY.apply_premul(px), px);
}

#[test]
fn grayscale_equalizes_channels_and_keeps_alpha() {
    let mut buf = vec![255, 0, 0, 255, 10, 80, 40, 128, 0, 0, 0, 0];
    ColorMatrix::GRAYSCALE.apply_in_place(&mut buf);
    for px in buf.chunks_exact(4) {
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }
    assert_eq!(buf[3], 255);
    assert_eq!(buf[7], 128);
    assert_eq!(buf[11], 0);
    // 0.21 * 255
    assert_eq!(buf[0], 54);
    assert!(ColorMatrix::GRAYSCALE.preserves_alpha());
}

#[test]
fn offsets_are_in_unit_channel_space() {
    let mut m = ColorMatrix::IDENTITY;
    m.0[4] = 1.0;
    assert_eq!(m.apply_premul([0, 0, 0, 255]), [255, 0, 0, 255]);
}

#[test]
fn saturate_one_is_identity_like() {
    let px = [30, 60, 90, 255];
    let out = ColorMatrix::saturate(1.0).apply_premul(px);
    for i in 0..3 {
        assert!((i32::from(out[i]) - i32::from(px[i])).abs() <= 1);
    }
}

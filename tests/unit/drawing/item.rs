use super::*;

fn square(x: f64, y: f64, size: f64) -> BezPath {
    rect_path(Rect::new(x, y, x + size, y + size))
}

#[test]
fn flag_sets_compose() {
    let f = StateFlags::BBOX | StateFlags::CACHE;
    assert!(f.contains(StateFlags::BBOX));
    assert!(!f.contains(StateFlags::ALL));
    assert!(f.intersects(StateFlags::CACHE | StateFlags::PICK));
    assert_eq!(StateFlags::ALL.difference(f), StateFlags::PICK | StateFlags::RENDER);
    assert!(StateFlags::empty().is_empty());
    assert!(PickFlags::all().contains(PickFlags::STICKY | PickFlags::OUTLINE));
    assert_eq!(StateFlags::ALL, StateFlags::all());
    assert_eq!(StateFlags::ALL.bits(), 0b1111);
    assert!(RenderFlags::empty().is_empty());
}

#[test]
fn item_ids_order_by_slot_then_generation() {
    let a = ItemId {
        index: 1,
        generation: 5,
    };
    let b = ItemId {
        index: 2,
        generation: 0,
    };
    assert!(a < b);
    assert_eq!(a.to_string(), "item#1.5");
}

#[test]
fn image_data_validates_length_and_samples_alpha() {
    let rect = Rect::new(0.0, 0.0, 20.0, 10.0);
    assert!(ImageData::new(2, 1, vec![0; 7], rect).is_err());
    assert!(ImageData::new(0, 1, vec![], rect).is_err());

    let img = ImageData::new(2, 1, vec![0, 0, 0, 0, 9, 9, 9, 255], rect).unwrap();
    assert_eq!(img.alpha_at(Point::new(5.0, 5.0)), Some(0));
    assert_eq!(img.alpha_at(Point::new(15.0, 5.0)), Some(255));
    assert_eq!(img.alpha_at(Point::new(25.0, 5.0)), None);
}

#[test]
fn decode_rejects_garbage() {
    let err = ImageData::decode(b"not an image", Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap_err();
    assert!(matches!(err, DrawError::Other(_)));
}

#[test]
fn device_bounds_include_stroke_and_transform() {
    let fill_only = Content::Shape(Arc::new(ShapeData::filled(square(0.0, 0.0, 10.0), [0, 0, 0, 255])));
    assert_eq!(
        fill_only.device_bounds(Affine::scale(2.0), 0.0),
        IntRect::new(0, 0, 20, 20)
    );

    let stroked = ShapeData::filled(square(0.0, 0.0, 10.0), [0, 0, 0, 255]).with_stroke(
        [0, 0, 0, 255],
        Stroke::new(2.0).with_join(Join::Round),
    );
    let stroked = Content::Shape(Arc::new(stroked));
    assert_eq!(
        stroked.device_bounds(Affine::IDENTITY, 0.0),
        IntRect::new(-1, -1, 11, 11)
    );
    assert_eq!(
        fill_only.device_bounds(Affine::IDENTITY, 0.5),
        IntRect::new(-1, -1, 11, 11)
    );
}

#[test]
fn empty_text_has_no_bounds() {
    let text = Content::Text(Arc::new(TextData::default()));
    assert!(text.user_bounds().is_none());
    assert!(!text.is_rasterizable());
}

#[test]
fn snapshot_paints_with_opacity_and_clip() {
    let snapshot = LeafSnapshot {
        content: Content::Shape(Arc::new(ShapeData::filled(
            square(0.0, 0.0, 4.0),
            [0, 0, 255, 255],
        ))),
        ctm: Affine::IDENTITY,
        opacity: 0.5,
        clip: Some(Arc::new(square(0.0, 0.0, 2.0))),
        antialias: true,
    };
    let rect = IntRect::new(0, 0, 4, 4).unwrap();
    let mut target = Surface::new(rect).unwrap();
    snapshot.paint(&mut target, rect).unwrap();
    assert_eq!(target.pixel(1, 1), Some([0, 0, 128, 128]));
    assert_eq!(target.pixel(3, 3), Some([0, 0, 0, 0]));
}

use super::*;

#[test]
fn new_cache_is_dirty_and_sized() {
    let c = DrawingCache::new(IntRect::new(0, 0, 10, 5).unwrap()).unwrap();
    assert!(!c.is_clean());
    assert_eq!(c.byte_size(), 200);
    assert_eq!(c.fill_count(), 0);
}

#[test]
fn store_cleans_and_paint_composites() {
    let rect = IntRect::new(0, 0, 2, 2).unwrap();
    let mut c = DrawingCache::new(rect).unwrap();
    let src = Surface::from_premul_rgba8(rect, &[0, 0, 255, 255].repeat(4)).unwrap();
    c.store(&src);
    assert!(c.is_clean());
    assert_eq!(c.fill_count(), 1);

    let mut target = Surface::new(IntRect::new(0, 0, 4, 4).unwrap()).unwrap();
    c.paint_onto(&mut target, IntRect::new(1, 1, 4, 4).unwrap());
    assert_eq!(target.pixel(1, 1), Some([0, 0, 255, 255]));
    assert_eq!(target.pixel(0, 0), Some([0, 0, 0, 0]));

    c.mark_dirty();
    assert!(!c.is_clean());
}

#[test]
fn shared_cache_locks() {
    let c = DrawingCache::new(IntRect::new(0, 0, 1, 1).unwrap())
        .unwrap()
        .shared();
    c.invalidate();
    assert_eq!(c.version(), 1);
    assert!(!lock_cache(&c).is_clean());
    assert!(c.try_lock().is_some());
}

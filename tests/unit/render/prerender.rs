use super::*;
use crate::drawing::item::{Content, ShapeData};
use crate::foundation::core::Affine;
use crate::render::cache::DrawingCache;
use crate::render::raster::rect_path;

fn square_job(x: i32) -> PrerenderJob {
    let rect = IntRect::from_xywh(x, 0, 8, 8).unwrap();
    let shape = ShapeData::filled(rect_path(rect.to_rect()), [255, 0, 0, 255]);
    let snapshot = LeafSnapshot {
        content: Content::Shape(Arc::new(shape)),
        ctm: Affine::IDENTITY,
        opacity: 1.0,
        clip: None,
        antialias: true,
    };
    PrerenderJob::new(snapshot, DrawingCache::new(rect).unwrap().shared())
}

#[test]
fn job_fills_stale_cache_once() {
    let job = square_job(0);
    job.run(None).unwrap();
    {
        let cache = lock_cache(&job.cache);
        assert!(cache.is_clean());
        assert_eq!(cache.surface().pixel(3, 3), Some([255, 0, 0, 255]));
    }
    job.run(None).unwrap();
    assert_eq!(lock_cache(&job.cache).fill_count(), 1);
}

#[test]
fn job_built_before_invalidation_leaves_cache_stale() {
    let job = square_job(0);
    job.cache.invalidate();
    job.run(None).unwrap();
    let cache = lock_cache(&job.cache);
    assert!(!cache.is_clean());
    assert_eq!(cache.fill_count(), 0);
}

#[test]
fn replaced_cache_rejects_older_jobs() {
    let job = square_job(0);
    let small = IntRect::from_xywh(0, 0, 4, 4).unwrap();
    job.cache.replace(DrawingCache::new(small).unwrap());
    job.run(None).unwrap();
    assert!(!lock_cache(&job.cache).is_clean());

    let fill = Surface::new(small).unwrap();
    assert!(!job.cache.store_if_current(0, &fill));
    assert!(job.cache.store_if_current(job.cache.version(), &fill));
}

#[test]
fn job_skips_caches_outside_area() {
    let job = square_job(0);
    job.run(IntRect::new(100, 100, 110, 110)).unwrap();
    assert!(!lock_cache(&job.cache).is_clean());
}

#[test]
fn pool_is_lazy_and_idle_before_first_batch() {
    let pool = PrerenderPool::new(0, WaitStrategy::Yield);
    assert_eq!(pool.num_workers(), 1);
    assert!(!pool.is_started());
    assert!(pool.is_idle());
    assert_eq!(pool.pending(), 0);
    pool.finish();
}

#[test]
fn finish_leaves_every_cache_clean() {
    for wait in [WaitStrategy::Spin, WaitStrategy::Yield, WaitStrategy::Block] {
        let mut pool = PrerenderPool::new(3, wait);
        let jobs: Vec<PrerenderJob> = (0..7).map(|i| square_job(i * 10)).collect();
        let caches: Vec<SharedCache> = jobs.iter().map(|j| Arc::clone(&j.cache)).collect();

        assert!(pool.work(jobs, None));
        pool.finish();
        assert!(pool.is_idle());
        for cache in &caches {
            assert!(lock_cache(cache).is_clean(), "{wait:?}");
        }
    }
}

#[test]
fn busy_pool_drops_new_batches() {
    let mut pool = PrerenderPool::new(1, WaitStrategy::Block);
    let job = square_job(0);
    let cache = Arc::clone(&job.cache);

    let guard = lock_cache(&cache);
    assert!(pool.work(vec![job], None));
    assert!(!pool.is_idle());

    let other = square_job(20);
    let other_cache = Arc::clone(&other.cache);
    assert!(!pool.work(vec![other], None));
    drop(guard);

    pool.finish();
    assert!(lock_cache(&cache).is_clean());
    assert!(!lock_cache(&other_cache).is_clean());

    assert!(pool.work(vec![square_job(40)], None));
    pool.finish();
}

#[test]
fn reset_accepts_work_again() {
    let mut pool = PrerenderPool::new(1, WaitStrategy::Yield);
    let job = square_job(0);
    let cache = Arc::clone(&job.cache);
    let guard = lock_cache(&cache);
    assert!(pool.work(vec![job], None));
    pool.reset();
    assert!(pool.is_idle());
    drop(guard);
    pool.stop_threads();
    assert!(!pool.is_started());
}

#[test]
fn stopped_pool_refuses_work() {
    let mut pool = PrerenderPool::new(2, WaitStrategy::Block);
    assert!(pool.work(vec![square_job(0)], None));
    pool.finish();
    pool.stop_threads();
    assert!(!pool.work(vec![square_job(0)], None));
}

#[test]
fn empty_batch_completes() {
    let mut pool = PrerenderPool::new(4, WaitStrategy::Yield);
    assert!(pool.work(Vec::new(), IntRect::new(0, 0, 1, 1)));
    pool.finish();
    assert!(pool.is_idle());
}

#[test]
fn stop_waits_for_claimed_shares() {
    let mut pool = PrerenderPool::new(2, WaitStrategy::Block);
    let job = square_job(0);
    let cache = Arc::clone(&job.cache);

    let held = Arc::clone(&cache);
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let holder = std::thread::spawn(move || {
        let _guard = lock_cache(&held);
        locked_tx.send(()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
    });
    locked_rx.recv().unwrap();

    assert!(pool.work(vec![job], None));
    assert!(pool.is_started());
    pool.stop_threads();
    assert!(!pool.is_started());
    holder.join().unwrap();
    // The claimed share dropped its job before stop returned.
    assert_eq!(Arc::strong_count(&cache), 1);
}

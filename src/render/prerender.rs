use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::drawing::item::LeafSnapshot;
use crate::foundation::config::WaitStrategy;
use crate::foundation::core::IntRect;
use crate::foundation::error::{DrawError, DrawResult};
use crate::render::cache::{SharedCache, lock_cache};
use crate::render::surface::Surface;

/// Counter value of a pool that accepts work.
const IDLE: isize = -1;

/// One cache to fill: a snapshot of the item's paint state and the cache it renders into.
///
/// The job remembers the cache version it was built against; if the item invalidates the
/// cache before the job runs, the job leaves it for the next repaint.
#[derive(Clone, Debug)]
pub struct PrerenderJob {
    pub(crate) snapshot: LeafSnapshot,
    pub(crate) cache: SharedCache,
    version: u64,
}

impl PrerenderJob {
    /// Pair a snapshot with its cache at the cache's current version.
    pub fn new(snapshot: LeafSnapshot, cache: SharedCache) -> Self {
        let version = cache.version();
        Self {
            snapshot,
            cache,
            version,
        }
    }

    /// Fill the cache if it is stale, overlaps `area` and was not invalidated since the job
    /// was built.
    pub fn run(&self, area: Option<IntRect>) -> DrawResult<()> {
        let rect = {
            let cache = lock_cache(&self.cache);
            if cache.is_clean() || self.cache.version() != self.version {
                return Ok(());
            }
            cache.rect()
        };
        if area.is_some_and(|a| !a.intersects(rect)) {
            return Ok(());
        }
        let mut surface = Surface::new(rect)?;
        self.snapshot.paint(&mut surface, rect)?;
        if !self.cache.store_if_current(self.version, &surface) {
            tracing::trace!("cache invalidated while prerendering, fill discarded");
        }
        Ok(())
    }
}

struct PoolShared {
    counter: AtomicIsize,
    running: AtomicUsize,
    exiting: AtomicBool,
    area: Mutex<Option<IntRect>>,
    slots: Vec<Mutex<Option<Vec<PrerenderJob>>>>,
    done_lock: Mutex<()>,
    done: Condvar,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PoolShared {
    fn notify_done(&self) {
        let _guard = lock(&self.done_lock);
        self.done.notify_all();
    }

    fn wait_until(&self, ready: impl Fn(&Self) -> bool) {
        let mut guard = lock(&self.done_lock);
        while !ready(self) {
            guard = self
                .done
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Run the share of the current batch assigned to worker slot `index`.
    fn claim(&self, index: usize) {
        let _release = ClaimRelease(self);
        if let Some(jobs) = lock(&self.slots[index]).take() {
            let area = *lock(&self.area);
            tracing::trace!(worker = index, jobs = jobs.len(), "prerender batch claimed");
            for job in &jobs {
                if self.exiting.load(Ordering::Acquire) {
                    break;
                }
                if let Err(err) = job.run(area) {
                    tracing::warn!(worker = index, %err, "prerender job failed");
                }
            }
        }
    }
}

/// Counts a claimed share as done even if one of its jobs panics.
struct ClaimRelease<'a>(&'a PoolShared);

impl Drop for ClaimRelease<'_> {
    fn drop(&mut self) {
        let shared = self.0;
        let last = shared.counter.fetch_sub(1, Ordering::AcqRel) == 1;
        let drained = shared.running.fetch_sub(1, Ordering::AcqRel) == 1;
        if last || drained {
            shared.notify_done();
        }
    }
}

/// Fixed set of named rayon threads filling item caches ahead of the next paint.
///
/// Each batch is split into one share per worker. Between batches the threads park inside
/// rayon; the pool's [`WaitStrategy`] decides how [`finish`](Self::finish) waits for a
/// batch: `Spin` and `Yield` keep the caller's core busy in exchange for the lowest
/// latency, `Block` sleeps on a condition variable.
pub struct PrerenderPool {
    shared: Arc<PoolShared>,
    threads: Option<rayon::ThreadPool>,
    wait: WaitStrategy,
}

impl PrerenderPool {
    /// Pool of `num_workers` (at least one) threads, started on the first batch.
    pub fn new(num_workers: usize, wait: WaitStrategy) -> Self {
        let n = num_workers.max(1);
        Self {
            shared: Arc::new(PoolShared {
                counter: AtomicIsize::new(IDLE),
                running: AtomicUsize::new(0),
                exiting: AtomicBool::new(false),
                area: Mutex::new(None),
                slots: (0..n).map(|_| Mutex::new(None)).collect(),
                done_lock: Mutex::new(()),
                done: Condvar::new(),
            }),
            threads: None,
            wait,
        }
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.shared.slots.len()
    }

    /// Whether the threads have been spawned.
    pub fn is_started(&self) -> bool {
        self.threads.is_some()
    }

    /// Whether a new batch would be accepted.
    pub fn is_idle(&self) -> bool {
        self.shared.counter.load(Ordering::Acquire) <= 0
    }

    /// Workers that still owe their share of the current batch.
    pub fn pending(&self) -> usize {
        self.shared.counter.load(Ordering::Acquire).max(0) as usize
    }

    fn start(&mut self) -> DrawResult<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers())
            .thread_name(|i| format!("drawtree-prerender-{i}"))
            .panic_handler(|_| tracing::warn!("prerender job panicked"))
            .build()
            .map_err(|e| DrawError::render(format!("failed to build prerender pool: {e}")))?;
        self.threads = Some(pool);
        Ok(())
    }

    /// Hand a batch to the workers, partitioned round-robin.
    ///
    /// Returns `false` (dropping the batch) while a previous batch is still in flight.
    #[tracing::instrument(level = "debug", skip_all, fields(jobs = jobs.len()))]
    pub fn work(&mut self, jobs: Vec<PrerenderJob>, area: Option<IntRect>) -> bool {
        if !self.is_idle() || self.shared.exiting.load(Ordering::Acquire) {
            tracing::debug!("prerender pool busy, batch dropped");
            return false;
        }
        if !self.is_started() {
            if let Err(err) = self.start() {
                tracing::warn!(%err, "failed to spawn prerender workers");
                return false;
            }
        }
        let Some(threads) = &self.threads else {
            return false;
        };

        let n = self.num_workers();
        let mut parts: Vec<Vec<PrerenderJob>> = (0..n).map(|_| Vec::new()).collect();
        for (i, job) in jobs.into_iter().enumerate() {
            parts[i % n].push(job);
        }

        *lock(&self.shared.area) = area;
        for (slot, part) in self.shared.slots.iter().zip(parts) {
            *lock(slot) = Some(part);
        }
        // Armed before the first claim can decrement it.
        self.shared.counter.store(n as isize, Ordering::Release);
        self.shared.running.fetch_add(n, Ordering::AcqRel);
        for i in 0..n {
            let shared = Arc::clone(&self.shared);
            threads.spawn(move || shared.claim(i));
        }
        true
    }

    /// Wait until every worker has finished its share of the current batch.
    pub fn finish(&self) {
        if !self.is_started() {
            return;
        }
        match self.wait {
            WaitStrategy::Spin => {
                while !self.is_idle() {
                    std::hint::spin_loop();
                }
            }
            WaitStrategy::Yield => {
                while !self.is_idle() {
                    std::thread::yield_now();
                }
            }
            WaitStrategy::Block => self
                .shared
                .wait_until(|s| s.counter.load(Ordering::Acquire) <= 0),
        }
    }

    /// Force the pool back to accepting work.
    pub fn reset(&self) {
        self.shared.counter.store(IDLE, Ordering::Release);
        self.shared.notify_done();
    }

    /// Signal exit, wait for every claimed share to return and release the threads.
    pub fn stop_threads(&mut self) {
        self.shared.exiting.store(true, Ordering::Release);
        self.shared.counter.store(0, Ordering::Release);
        self.shared.notify_done();
        if self.threads.take().is_some() {
            self.shared.wait_until(|s| s.running.load(Ordering::Acquire) == 0);
        }
    }
}

impl std::fmt::Debug for PrerenderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrerenderPool")
            .field("num_workers", &self.num_workers())
            .field("started", &self.is_started())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for PrerenderPool {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/prerender.rs"]
mod tests;

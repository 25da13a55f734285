use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::foundation::core::IntRect;
use crate::foundation::error::DrawResult;
use crate::render::composite::over_surface;
use crate::render::surface::Surface;

/// Pixel cache owned by one drawing item.
///
/// The surface always covers `rect()`; `is_clean()` tells whether it holds the item's
/// current rendering.
#[derive(Debug)]
pub struct DrawingCache {
    surface: Surface,
    clean: bool,
    fills: u64,
}

/// A cache plus the version of its contents, shared between the item and the prerender
/// worker filling it.
///
/// The version moves whenever the item invalidates the pixels; it is only written with the
/// cache locked and can be read without the lock.
#[derive(Debug)]
pub struct CacheCell {
    version: AtomicU64,
    cache: Mutex<DrawingCache>,
}

/// Cache shared between its item and the prerender worker filling it.
pub type SharedCache = Arc<CacheCell>;

impl CacheCell {
    /// Current version of the contents.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Lock the cache, recovering the data if a filling thread panicked.
    pub fn lock(&self) -> MutexGuard<'_, DrawingCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the cache unless someone else holds it.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, DrawingCache>> {
        match self.cache.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Mark the pixels stale and retire every fill prepared against the old version.
    pub fn invalidate(&self) {
        let mut cache = self.lock();
        self.version.fetch_add(1, Ordering::AcqRel);
        cache.mark_dirty();
    }

    /// Swap in a fresh cache, typically for a new device rectangle.
    pub fn replace(&self, fresh: DrawingCache) {
        let mut cache = self.lock();
        self.version.fetch_add(1, Ordering::AcqRel);
        *cache = fresh;
    }

    /// Store `rendered` if the contents are still at `version` and stale.
    ///
    /// Returns whether the pixels were stored.
    pub fn store_if_current(&self, version: u64, rendered: &Surface) -> bool {
        let mut cache = self.lock();
        if self.version() != version || cache.is_clean() {
            return false;
        }
        cache.store(rendered);
        true
    }
}

impl DrawingCache {
    /// Dirty cache covering `rect`.
    pub fn new(rect: IntRect) -> DrawResult<Self> {
        Ok(Self {
            surface: Surface::new(rect)?,
            clean: false,
            fills: 0,
        })
    }

    /// Wrap for sharing with workers.
    pub fn shared(self) -> SharedCache {
        Arc::new(CacheCell {
            version: AtomicU64::new(0),
            cache: Mutex::new(self),
        })
    }

    /// Device rectangle covered.
    pub fn rect(&self) -> IntRect {
        self.surface.rect()
    }

    /// Bytes held.
    pub fn byte_size(&self) -> usize {
        self.surface.byte_size()
    }

    /// Whether the pixels are current.
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Number of times the cache has been (re)filled.
    pub fn fill_count(&self) -> u64 {
        self.fills
    }

    /// Mark the pixels stale without moving the version; see [`CacheCell::invalidate`].
    pub(crate) fn mark_dirty(&mut self) {
        self.clean = false;
    }

    /// Cached pixels.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Replace the contents with a rendering of the whole cache rectangle.
    pub fn store(&mut self, rendered: &Surface) {
        self.surface.clear();
        let rect = self.surface.rect();
        self.surface.copy_from(rendered, rect);
        self.clean = true;
        self.fills += 1;
    }

    /// Composite the cached pixels inside `area` over `target`.
    pub fn paint_onto(&self, target: &mut Surface, area: IntRect) {
        over_surface(target, &self.surface, area, 1.0);
    }
}

/// Lock a cache, recovering the data if a filling thread panicked.
pub fn lock_cache(cache: &SharedCache) -> MutexGuard<'_, DrawingCache> {
    cache.lock()
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;

//! Region pooling with power-of-two size classes.

use std::sync::{Arc, Mutex, Weak};

use hawser_common::Result;

use crate::region::{MemoryKind, MemoryRegion, SharedRegion};

/// Smallest size class, one cache line.
const MIN_CLASS_SIZE: usize = 64;

/// Bounds for a [`MemoryPool`].
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Largest allocation size eligible for pooling. Larger requests are
    /// served directly from the backing allocator and freed on release.
    pub max_pooled_size: usize,
    /// Upper bound on the number of retained regions per size class.
    pub max_regions_per_class: usize,
}

impl Default for PoolConfig {
    fn default() -> PoolConfig {
        PoolConfig {
            max_pooled_size: 4 * 1024 * 1024,
            max_regions_per_class: 64,
        }
    }
}

/// A pool of reusable [`MemoryRegion`]s organized into power-of-two size
/// classes.
///
/// Regions released by the last [`SharedRegion`] handle land on the shelf
/// matching their length and are handed out again by later allocations.
/// Cloning the pool is cheap and all clones share the same shelves. A pool
/// serves one allocator strategy, so every region in it has the same
/// [`MemoryKind`].
#[derive(Clone)]
pub struct MemoryPool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    config: PoolConfig,
    shelves: Vec<Mutex<Vec<MemoryRegion>>>,
}

impl MemoryPool {
    /// Creates a pool with the given bounds.
    pub fn new(config: PoolConfig) -> MemoryPool {
        let classes = class_index(MemoryPool::class_size(config.max_pooled_size)) + 1;
        let shelves = (0..classes).map(|_| Mutex::new(Vec::new())).collect();
        MemoryPool {
            inner: Arc::new(PoolInner { config, shelves }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// The size class a request of `size` bytes maps to.
    ///
    /// Pooled regions are always allocated at their class size, so that a
    /// recycled region fits any later request of the same class.
    pub fn class_size(size: usize) -> usize {
        size.next_power_of_two().max(MIN_CLASS_SIZE)
    }

    /// Whether allocations of `size` bytes are eligible for pooling.
    pub fn accepts(&self, size: usize) -> bool {
        size != 0 && size <= self.inner.config.max_pooled_size
    }

    /// Produces a [`SharedRegion`] of length at least `size` with a reference
    /// count of exactly one, reusing a retained region when one is available.
    ///
    /// A recycled region keeps whatever contents it had when it was released;
    /// callers gate reads behind their own written-range bookkeeping. Requests
    /// the pool does not accept are served as plain unpooled regions.
    pub fn allocate(&self, kind: MemoryKind, size: usize) -> Result<SharedRegion> {
        if !self.accepts(size) {
            return Ok(MemoryRegion::allocate(kind, size)?.into_shared());
        }
        let region = match self.take(size) {
            Some(region) => region,
            None => MemoryRegion::allocate(kind, MemoryPool::class_size(size))?,
        };
        Ok(SharedRegion::pooled(region, self))
    }

    /// Pops a retained region whose length covers `size`, if one is
    /// available.
    pub fn take(&self, size: usize) -> Option<MemoryRegion> {
        if !self.accepts(size) {
            return None;
        }
        let shelf = self.inner.shelf(MemoryPool::class_size(size))?;
        shelf.lock().unwrap().pop()
    }

    /// Number of regions currently retained by the pool.
    pub fn pooled_regions(&self) -> usize {
        self.inner
            .shelves
            .iter()
            .map(|shelf| shelf.lock().unwrap().len())
            .sum()
    }

    /// Total length, in bytes, of the regions currently retained.
    pub fn pooled_bytes(&self) -> usize {
        self.inner
            .shelves
            .iter()
            .map(|shelf| {
                shelf
                    .lock()
                    .unwrap()
                    .iter()
                    .map(MemoryRegion::len)
                    .sum::<usize>()
            })
            .sum()
    }

    /// Drops every retained region, returning the memory to the backing
    /// allocator.
    pub fn clear(&self) {
        for shelf in &self.inner.shelves {
            shelf.lock().unwrap().clear();
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<PoolInner> {
        Arc::downgrade(&self.inner)
    }
}

impl Default for MemoryPool {
    fn default() -> MemoryPool {
        MemoryPool::new(PoolConfig::default())
    }
}

impl std::fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPool")
            .field("config", &self.inner.config)
            .field("pooled_regions", &self.pooled_regions())
            .field("pooled_bytes", &self.pooled_bytes())
            .finish()
    }
}

impl PoolInner {
    fn shelf(&self, class_size: usize) -> Option<&Mutex<Vec<MemoryRegion>>> {
        self.shelves.get(class_index(class_size))
    }

    /// Retains a region for reuse, or drops it when it does not fit the
    /// pool's bounds.
    ///
    /// Only regions allocated at a class size come back here; anything else
    /// (odd lengths, empty placeholders) is let go.
    pub(crate) fn recycle(&self, region: MemoryRegion) {
        let len = region.len();
        if len < MIN_CLASS_SIZE || !len.is_power_of_two() {
            return;
        }
        if let Some(shelf) = self.shelf(len) {
            let mut shelf = shelf.lock().unwrap();
            if shelf.len() < self.config.max_regions_per_class {
                shelf.push(region);
            }
        }
    }
}

#[inline]
fn class_index(class_size: usize) -> usize {
    (class_size.trailing_zeros() - MIN_CLASS_SIZE.trailing_zeros()) as usize
}

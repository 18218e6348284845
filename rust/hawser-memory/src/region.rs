//! Memory regions and reference-counted handles over them.

use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use hawser_common::{Result, error::Error};
use hawser_page_alloc::page_buffer::PageBuffer;

use crate::heap::HeapMemory;
use crate::pool::{MemoryPool, PoolInner};
use crate::refcount::RefCount;

/// Placement of an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    /// Regular heap memory obtained from the global allocator.
    Heap,
    /// Page-granular native memory obtained directly from the operating
    /// system.
    Native,
}

/// A single backing allocation, either heap-based or native.
///
/// A region is plain owned storage with no sharing semantics of its own;
/// [`SharedRegion`] layers reference counting on top. The `Empty` variant is
/// what remains when a region is taken out of a retiring handle for
/// recycling; live handles never observe it.
#[derive(Debug, Default)]
pub enum MemoryRegion {
    #[default]
    Empty,
    Heap(HeapMemory),
    Native(PageBuffer),
}

impl MemoryRegion {
    /// Allocates a zero-filled heap region of exactly `len` bytes.
    pub fn heap(len: usize) -> MemoryRegion {
        MemoryRegion::Heap(HeapMemory::allocate(len))
    }

    /// Allocates a zero-filled native region of `len` usable bytes.
    pub fn native(len: usize) -> Result<MemoryRegion> {
        let pages =
            PageBuffer::allocate(len).map_err(|e| Error::io("allocating native memory", e))?;
        Ok(MemoryRegion::Native(pages))
    }

    /// Allocates a zero-filled region of the requested kind and length.
    pub fn allocate(kind: MemoryKind, len: usize) -> Result<MemoryRegion> {
        match kind {
            MemoryKind::Heap => Ok(MemoryRegion::heap(len)),
            MemoryKind::Native => MemoryRegion::native(len),
        }
    }

    /// Number of usable bytes in the region.
    pub fn len(&self) -> usize {
        match self {
            MemoryRegion::Empty => 0,
            MemoryRegion::Heap(heap) => heap.capacity(),
            MemoryRegion::Native(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> MemoryKind {
        match self {
            MemoryRegion::Empty | MemoryRegion::Heap(_) => MemoryKind::Heap,
            MemoryRegion::Native(_) => MemoryKind::Native,
        }
    }

    /// The native address of the region, `Some` only for native storage.
    pub fn native_address(&self) -> Option<NonNull<u8>> {
        match self {
            MemoryRegion::Native(pages) => NonNull::new(pages.ptr()),
            _ => None,
        }
    }

    /// Read access to the whole region.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            MemoryRegion::Empty => &[],
            MemoryRegion::Heap(heap) => heap.as_slice(),
            MemoryRegion::Native(pages) => pages.as_bytes(),
        }
    }

    /// Write access to the whole region.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            MemoryRegion::Empty => &mut [],
            MemoryRegion::Heap(heap) => heap.as_mut_slice(),
            MemoryRegion::Native(pages) => pages.as_bytes_mut(),
        }
    }

    /// Pointer to the first byte of the region.
    pub fn as_ptr(&self) -> *const u8 {
        self.base_ptr()
    }

    /// Wraps the region in a [`SharedRegion`] with a count of one.
    pub fn into_shared(self) -> SharedRegion {
        SharedRegion {
            core: Arc::new(RegionCore {
                region: self,
                refs: RefCount::new(),
                pool: None,
            }),
        }
    }

    fn base_ptr(&self) -> *mut u8 {
        match self {
            MemoryRegion::Empty => NonNull::dangling().as_ptr(),
            MemoryRegion::Heap(heap) => heap.ptr(),
            MemoryRegion::Native(pages) => pages.ptr(),
        }
    }
}

struct RegionCore {
    region: MemoryRegion,
    refs: RefCount,
    pool: Option<Weak<PoolInner>>,
}

impl Drop for RegionCore {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.as_ref().and_then(Weak::upgrade) {
            pool.recycle(std::mem::take(&mut self.region));
        }
    }
}

/// A reference-counted handle to a [`MemoryRegion`].
///
/// Every live `SharedRegion` value accounts for exactly one reference:
/// cloning acquires, dropping releases. When the last handle drops, the
/// region returns to its pool of origin, if any, otherwise it is freed.
///
/// The handle exposes the region as raw byte windows. Callers carve the
/// region into disjoint windows and must never overlap a mutable window with
/// any other; the buffer layer maintains that discipline through its
/// exclusive ownership of each window.
pub struct SharedRegion {
    core: Arc<RegionCore>,
}

impl SharedRegion {
    /// Wraps a region that returns to `pool` when the last handle drops.
    pub(crate) fn pooled(region: MemoryRegion, pool: &MemoryPool) -> SharedRegion {
        SharedRegion {
            core: Arc::new(RegionCore {
                region,
                refs: RefCount::new(),
                pool: Some(pool.downgrade()),
            }),
        }
    }

    /// Number of usable bytes in the underlying region.
    #[inline]
    pub fn len(&self) -> usize {
        self.core.region.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core.region.is_empty()
    }

    #[inline]
    pub fn kind(&self) -> MemoryKind {
        self.core.region.kind()
    }

    /// The native address of the region, `Some` only for native storage.
    #[inline]
    pub fn native_address(&self) -> Option<NonNull<u8>> {
        self.core.region.native_address()
    }

    /// Pointer to the first byte of the region.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.core.region.as_ptr()
    }

    /// Number of live handles to this region.
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.core.refs.count()
    }

    /// Borrows `len` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// `offset + len` must not exceed [`len`](SharedRegion::len), and no
    /// handle may mutate an overlapping window for the lifetime of the
    /// returned slice.
    pub unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len()));
        unsafe { std::slice::from_raw_parts(self.core.region.base_ptr().add(offset), len) }
    }

    /// Mutably borrows `len` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// `offset + len` must not exceed [`len`](SharedRegion::len), and the
    /// caller must hold the only access to any window overlapping
    /// `offset..offset + len` for the lifetime of the returned slice.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len()));
        unsafe { std::slice::from_raw_parts_mut(self.core.region.base_ptr().add(offset), len) }
    }
}

impl Clone for SharedRegion {
    fn clone(&self) -> SharedRegion {
        self.core.refs.acquire();
        SharedRegion {
            core: Arc::clone(&self.core),
        }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        self.core.refs.release();
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryKind, MemoryRegion};

    #[test]
    fn test_heap_region() {
        let region = MemoryRegion::heap(1000);
        assert_eq!(region.len(), 1000);
        assert_eq!(region.kind(), MemoryKind::Heap);
        assert!(region.native_address().is_none());
        assert!(region.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_native_region() {
        let region = MemoryRegion::native(1000).unwrap();
        assert_eq!(region.len(), 1000);
        assert_eq!(region.kind(), MemoryKind::Native);
        assert_eq!(
            region.native_address().unwrap().as_ptr() as *const u8,
            region.as_ptr()
        );
        assert!(region.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_length_regions() {
        let heap = MemoryRegion::heap(0);
        assert!(heap.is_empty());
        assert_eq!(heap.kind(), MemoryKind::Heap);

        let native = MemoryRegion::native(0).unwrap();
        assert!(native.is_empty());
        assert_eq!(native.kind(), MemoryKind::Native);
    }

    #[test]
    fn test_allocate_by_kind() {
        for kind in [MemoryKind::Heap, MemoryKind::Native] {
            let region = MemoryRegion::allocate(kind, 64).unwrap();
            assert_eq!(region.kind(), kind);
            assert_eq!(region.len(), 64);
        }
    }

    #[test]
    fn test_write_through_mut_slice() {
        let mut region = MemoryRegion::heap(64);
        fastrand::seed(41);
        let data: Vec<u8> = (0..64).map(|_| fastrand::u8(..)).collect();
        region.as_mut_slice().copy_from_slice(&data);
        assert_eq!(region.as_slice(), &data[..]);
    }

    #[test]
    fn test_shared_region_counting() {
        let shared = MemoryRegion::heap(128).into_shared();
        assert_eq!(shared.ref_count(), 1);
        assert_eq!(shared.len(), 128);

        let second = shared.clone();
        assert_eq!(shared.ref_count(), 2);
        assert_eq!(second.ref_count(), 2);

        drop(shared);
        assert_eq!(second.ref_count(), 1);
    }

    #[test]
    fn test_windows() {
        let shared = MemoryRegion::heap(64).into_shared();

        unsafe {
            shared.slice_mut(0, 32).fill(1);
            shared.slice_mut(32, 32).fill(2);
        }
        let (left, right) = unsafe { (shared.slice(0, 32), shared.slice(32, 32)) };
        assert!(left.iter().all(|&b| b == 1));
        assert!(right.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_windows_cross_thread() {
        let shared = MemoryRegion::heap(64).into_shared();
        let second = shared.clone();

        let handle = std::thread::spawn(move || {
            unsafe { second.slice_mut(32, 32).fill(7) };
        });
        unsafe { shared.slice_mut(0, 32).fill(3) };
        handle.join().unwrap();

        let all = unsafe { shared.slice(0, 64) };
        assert!(all[..32].iter().all(|&b| b == 3));
        assert!(all[32..].iter().all(|&b| b == 7));
    }

    #[test]
    fn test_debug() {
        let shared = MemoryRegion::heap(16).into_shared();
        let repr = format!("{shared:?}");
        assert!(repr.contains("len: 16"));
        assert!(repr.contains("ref_count: 1"));
    }
}

//! An owning, fixed-length byte span backed by OS memory pages.

use crate::pages;

/// A page-backed memory buffer.
///
/// `PageBuffer` owns a span of anonymous memory pages obtained from the
/// platform allocator. The logical length is the size requested at
/// allocation; the physical capacity is that size rounded up to the page
/// boundary. The shape is fixed for the lifetime of the buffer, and the
/// memory is zero-filled by the OS on allocation.
pub struct PageBuffer {
    /// Raw pointer to the allocated pages.
    ptr: *mut u8,
    /// The requested size of the buffer in bytes.
    len: usize,
    /// The actual allocated capacity (page-rounded, >= `len`).
    capacity: usize,
}

impl PageBuffer {
    /// Returns the size of a memory page on the current system.
    pub fn page_size() -> usize {
        pages::get_page_size()
    }

    /// Allocates a zeroed buffer of `size` logical bytes.
    ///
    /// A `size` of zero is legal and still reserves one page.
    ///
    /// # Errors
    ///
    /// Returns the underlying `io::Error` if the system cannot allocate the
    /// requested pages.
    pub fn allocate(size: usize) -> std::io::Result<PageBuffer> {
        let (ptr, capacity) = pages::allocate(size)?;
        assert!((ptr as usize).is_multiple_of(Self::page_size()));
        Ok(PageBuffer {
            ptr: ptr as _,
            len: size,
            capacity,
        })
    }

    /// Returns the requested length of the buffer in bytes (not the
    /// page-rounded capacity).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer has a length of 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the actual allocated capacity in bytes, always page-aligned
    /// and at least as large as the requested length.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a raw pointer to the beginning of the allocated memory.
    ///
    /// # Safety
    ///
    /// The caller must not use the pointer after the `PageBuffer` is dropped,
    /// must stay within `0..len`, and must synchronize concurrent access.
    #[inline]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Returns an immutable byte slice covering the logical length.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Returns a mutable byte slice covering the logical length.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl std::ops::Deref for PageBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl std::ops::DerefMut for PageBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_bytes_mut()
    }
}

impl AsRef<[u8]> for PageBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsMut<[u8]> for PageBuffer {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

impl Drop for PageBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            let _ = unsafe { pages::free(self.ptr as _, self.capacity) };
        }
    }
}

// SAFETY: PageBuffer can be safely sent between threads as it owns the memory
// pages and deallocates them on drop.
unsafe impl Send for PageBuffer {}

// SAFETY: PageBuffer can be safely shared between threads; mutation requires
// `&mut self`, so aliasing is governed by the borrow rules.
unsafe impl Sync for PageBuffer {}

impl std::fmt::Debug for PageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

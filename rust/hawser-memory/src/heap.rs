//! Aligned heap allocations backing on-heap memory regions.

/// A fixed-size, zero-filled heap allocation whose first byte is aligned to
/// [`HeapMemory::ALIGNMENT`].
///
/// Unlike a `Vec<u8>`, the span never grows, shrinks or reallocates, so the
/// pointer returned by [`ptr`](HeapMemory::ptr) stays valid for the lifetime
/// of the value even as the value itself moves.
pub struct HeapMemory {
    ptr: *mut u8,
    capacity: usize,
    /// Owns the allocation; the aligned span starts at some offset inside it.
    inner: Vec<u8>,
}

impl HeapMemory {
    /// Alignment guaranteed for the start of the span, in bytes.
    pub const ALIGNMENT: usize = 64;

    /// Allocates a zero-filled span of exactly `capacity` bytes.
    pub fn allocate(capacity: usize) -> HeapMemory {
        if capacity == 0 {
            let mut inner = Vec::new();
            let ptr = inner.as_mut_ptr();
            return HeapMemory {
                ptr,
                capacity: 0,
                inner,
            };
        }

        let padded = capacity.checked_add(Self::ALIGNMENT).expect("add");
        let mut inner = vec![0u8; padded];
        let p = inner.as_ptr() as usize;
        let start = round_up(p, Self::ALIGNMENT) - p;
        let ptr = unsafe { inner.as_mut_ptr().add(start) };
        HeapMemory {
            ptr,
            capacity,
            inner,
        }
    }

    /// Number of usable bytes in the span.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Pointer to the first byte of the span.
    #[inline]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Read access to the whole span.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.capacity) }
    }

    /// Write access to the whole span.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.capacity) }
    }
}

// SAFETY: `HeapMemory` exclusively owns its allocation; the raw pointer is
// only a view into the vector held by the same value.
unsafe impl Send for HeapMemory {}

// SAFETY: shared access hands out `&[u8]` only, and mutation requires
// `&mut self`.
unsafe impl Sync for HeapMemory {}

impl std::ops::Deref for HeapMemory {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::DerefMut for HeapMemory {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl AsRef<[u8]> for HeapMemory {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for HeapMemory {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl std::fmt::Debug for HeapMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapMemory")
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .field("padding", &(self.inner.len() - self.capacity))
            .finish()
    }
}

/// Rounds up a number to the next multiple of `block_size`.
#[inline]
fn round_up(n: usize, block_size: usize) -> usize {
    n.checked_add(block_size - 1).expect("add") & !(block_size - 1)
}

#[cfg(test)]
mod tests {
    use super::HeapMemory;

    fn is_aligned(ptr: *const u8) -> bool {
        (ptr as usize) % HeapMemory::ALIGNMENT == 0
    }

    #[test]
    fn test_allocate_is_aligned() {
        for size in [1, 17, 64, 100, 4096, 1024 * 1024] {
            let mem = HeapMemory::allocate(size);
            assert!(is_aligned(mem.ptr()));
            assert_eq!(mem.capacity(), size);
        }
    }

    #[test]
    fn test_allocate_zero_size() {
        let mem = HeapMemory::allocate(0);
        assert_eq!(mem.capacity(), 0);
        assert!(mem.is_empty());
        assert!(mem.as_slice().is_empty());
    }

    #[test]
    fn test_allocate_is_zero_filled() {
        let mem = HeapMemory::allocate(4096);
        assert!(mem.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read_back() {
        let mut mem = HeapMemory::allocate(256);
        fastrand::seed(2817);
        let data: Vec<u8> = (0..256).map(|_| fastrand::u8(..)).collect();
        mem.as_mut_slice().copy_from_slice(&data);
        assert_eq!(mem.as_slice(), &data[..]);
    }

    #[test]
    fn test_survives_moves() {
        let mut mem = HeapMemory::allocate(128);
        mem.as_mut_slice()[0] = 0xab;
        mem.as_mut_slice()[127] = 0xcd;

        let mut holder = Vec::new();
        holder.push(mem);
        let mem = holder.pop().unwrap();
        assert_eq!(mem.as_slice()[0], 0xab);
        assert_eq!(mem.as_slice()[127], 0xcd);
    }

    #[test]
    fn test_deref() {
        let mut mem = HeapMemory::allocate(16);
        mem[3] = 7;
        assert_eq!(mem[3], 7);
        assert_eq!(mem.len(), 16);
    }

    #[test]
    fn test_multiple_allocations_are_distinct() {
        let mut first = HeapMemory::allocate(64);
        let mut second = HeapMemory::allocate(64);
        first.as_mut_slice().fill(1);
        second.as_mut_slice().fill(2);
        assert!(first.as_slice().iter().all(|&b| b == 1));
        assert!(second.as_slice().iter().all(|&b| b == 2));
    }

    #[test]
    fn test_debug() {
        let mem = HeapMemory::allocate(32);
        let repr = format!("{mem:?}");
        assert!(repr.contains("HeapMemory"));
        assert!(repr.contains("capacity: 32"));
    }
}

//! Atomic reference counting for shared memory regions.

use std::sync::atomic::{AtomicUsize, Ordering};

/// An atomic count of the live handles to a shared resource.
///
/// The count starts at one for the initial owner. [`acquire`](RefCount::acquire)
/// registers an additional handle and [`release`](RefCount::release) retires
/// one, reporting whether it was the last. Touching a count that has already
/// dropped to zero is a bug in the caller and panics rather than resurrecting
/// the resource.
pub struct RefCount(AtomicUsize);

impl RefCount {
    /// Creates a count with a single outstanding reference.
    pub fn new() -> RefCount {
        RefCount(AtomicUsize::new(1))
    }

    /// Returns the current number of outstanding references.
    ///
    /// The value is a point-in-time snapshot and may already be stale when the
    /// caller inspects it.
    #[inline]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Registers one more reference.
    ///
    /// # Panics
    ///
    /// Panics if the count has already reached zero.
    pub fn acquire(&self) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            assert_ne!(current, 0, "acquire on a retired ref-count");
            match self.0.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Retires one reference, returning `true` when it was the last.
    ///
    /// # Panics
    ///
    /// Panics if the count is already zero.
    pub fn release(&self) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            assert_ne!(current, 0, "release on a retired ref-count");
            match self.0.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current == 1,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for RefCount {
    fn default() -> RefCount {
        RefCount::new()
    }
}

impl std::fmt::Debug for RefCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RefCount").field(&self.count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::RefCount;

    #[test]
    fn test_new_refcount() {
        let refs = RefCount::new();
        assert_eq!(refs.count(), 1);
    }

    #[test]
    fn test_acquire_increments() {
        let refs = RefCount::new();
        refs.acquire();
        refs.acquire();
        assert_eq!(refs.count(), 3);
    }

    #[test]
    fn test_release_reports_last() {
        let refs = RefCount::new();
        refs.acquire();
        assert!(!refs.release());
        assert_eq!(refs.count(), 1);
        assert!(refs.release());
        assert_eq!(refs.count(), 0);
    }

    #[test]
    #[should_panic(expected = "acquire on a retired ref-count")]
    fn test_acquire_after_zero_panics() {
        let refs = RefCount::new();
        assert!(refs.release());
        refs.acquire();
    }

    #[test]
    #[should_panic(expected = "release on a retired ref-count")]
    fn test_release_after_zero_panics() {
        let refs = RefCount::new();
        assert!(refs.release());
        refs.release();
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let refs = Arc::new(RefCount::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let refs = refs.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    refs.acquire();
                    assert!(!refs.release());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(refs.count(), 1);
        assert!(refs.release());
    }

    #[test]
    fn test_concurrent_release_of_distributed_refs() {
        let refs = Arc::new(RefCount::new());
        for _ in 0..16 {
            refs.acquire();
        }

        let mut handles = vec![];
        for _ in 0..8 {
            let refs = refs.clone();
            handles.push(thread::spawn(move || {
                let mut last = 0;
                for _ in 0..2 {
                    if refs.release() {
                        last += 1;
                    }
                }
                last
            }));
        }

        let lasts: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(lasts, 0);
        assert_eq!(refs.count(), 1);
    }
}

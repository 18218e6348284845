use std::sync::OnceLock;

/// Allocates zeroed memory pages via anonymous `mmap`.
///
/// The allocation is rounded up to the nearest page boundary, so the returned
/// capacity may exceed the requested `size`. A `size` of zero still yields one
/// page.
///
/// # Returns
///
/// `Ok((ptr, capacity))` with a page-aligned pointer to readable and writable
/// memory, zero-filled by the kernel, or the `io::Error` reported by `mmap`.
///
/// # Safety
///
/// The returned pointer must be deallocated with [`free`], passing the
/// returned capacity (not the requested size).
pub fn allocate(size: usize) -> std::io::Result<(*mut std::ffi::c_void, usize)> {
    let page_size = get_page_size();
    assert!(page_size.is_power_of_two());
    let capacity = (size.max(1) + page_size - 1) & !(page_size - 1);
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            capacity,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr.is_null() || ptr == libc::MAP_FAILED {
        let err = std::io::Error::last_os_error();
        return Err(err);
    }
    Ok((ptr, capacity))
}

/// Frees pages previously obtained from [`allocate`].
///
/// # Safety
///
/// `ptr` must come from a prior [`allocate`] call, `size` must be the capacity
/// that call returned, the memory must not have been freed already, and no
/// references into it may remain.
pub unsafe fn free(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { libc::munmap(ptr, size) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Returns the system page size in bytes, cached after the first query.
///
/// Falls back to 4KB if `sysconf(_SC_PAGESIZE)` fails.
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    if let Some(&size) = SIZE.get() {
        size
    } else {
        match read_page_size() {
            Ok(size) => {
                let _ = SIZE.set(size);
                size
            }
            Err(_) => 4 * 1024,
        }
    }
}

fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    assert!(res < i32::MAX as _);
    Ok(res as usize)
}

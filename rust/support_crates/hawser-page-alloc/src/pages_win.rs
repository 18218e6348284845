use std::sync::OnceLock;
use windows_sys::Win32::{
    Foundation::GetLastError,
    System::{
        Memory::{MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE, VirtualAlloc, VirtualFree},
        SystemInformation::{GetSystemInfo, SYSTEM_INFO},
    },
};

/// Allocates zeroed memory pages via `VirtualAlloc`.
///
/// The allocation is rounded up to the nearest page boundary, so the returned
/// capacity may exceed the requested `size`. A `size` of zero still yields one
/// page.
///
/// # Returns
///
/// `Ok((ptr, capacity))` with a page-aligned pointer to readable and writable
/// memory, zero-filled by the OS, or the `io::Error` corresponding to
/// `GetLastError`.
///
/// # Safety
///
/// The returned pointer must be deallocated with [`free`], passing the
/// returned capacity (not the requested size).
pub fn allocate(size: usize) -> std::io::Result<(*mut std::ffi::c_void, usize)> {
    let page_size = get_page_size();
    assert!(page_size.is_power_of_two());
    let capacity = (size.max(1) + page_size - 1) & !(page_size - 1);

    unsafe {
        let ptr = VirtualAlloc(
            std::ptr::null_mut(),
            capacity,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        );

        if ptr.is_null() {
            let error = GetLastError();
            return Err(std::io::Error::from_raw_os_error(error as i32));
        }

        Ok((ptr, capacity))
    }
}

/// Frees pages previously obtained from [`allocate`].
///
/// # Safety
///
/// `ptr` must come from a prior [`allocate`] call, `size` must be the capacity
/// that call returned, the memory must not have been freed already, and no
/// references into it may remain.
pub unsafe fn free(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    assert!(size.is_multiple_of(get_page_size()));
    unsafe {
        let result = VirtualFree(ptr, 0, MEM_RELEASE);
        if result == 0 {
            let error = GetLastError();
            return Err(std::io::Error::from_raw_os_error(error as i32));
        }
    }
    Ok(())
}

/// Returns the system page size in bytes, cached after the first query.
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();

    *SIZE.get_or_init(|| unsafe {
        let mut system_info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut system_info);
        system_info.dwPageSize as usize
    })
}

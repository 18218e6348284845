//! Page-granular memory allocation for native (off-heap) buffer regions.
//!
//! The [`pages`] module exposes the raw per-platform allocation primitives
//! (anonymous `mmap` on Linux, `VirtualAlloc` on Windows, aligned heap
//! allocation elsewhere); [`page_buffer::PageBuffer`] wraps them in an
//! owning, fixed-length byte span.

pub mod page_buffer;

#[cfg_attr(any(target_os = "linux"), path = "pages_linux.rs")]
#[cfg_attr(windows, path = "pages_win.rs")]
#[cfg_attr(not(any(target_os = "linux", windows)), path = "pages_fallback.rs")]
pub mod pages;

//! Umbrella crate for the Hawser buffer engine.
//!
//! Re-exports the individual crates under stable module names so that
//! applications can depend on `hawser` alone:
//!
//! - [`buffer`]: allocators, buffers, component iteration and cursors.
//! - [`memory`]: memory regions, reference counting and the size-class pool.
//! - [`common`]: the shared error and result types.

pub use hawser_buffer as buffer;
pub use hawser_common as common;
pub use hawser_memory as memory;

/// Low-level building blocks, normally reached through [`memory`].
pub mod support {
    pub use hawser_page_alloc as page_alloc;
}

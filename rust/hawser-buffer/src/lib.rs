//! Reference-counted, pooled byte buffers.
//!
//! The crate is built around three pieces:
//!
//! - [`BufferAllocator`]: decides where buffer memory lives (heap or native)
//!   and whether released storage is recycled through a pool.
//! - [`Buffer`]: a linear byte range with separate reader and writer
//!   offsets, either backed by one contiguous memory region or composed from
//!   several constituent buffers that read and write as one.
//! - Component iteration and [`ByteCursor`]s: zero-copy access to the
//!   contiguous ranges inside a buffer, for handing to vectored I/O or
//!   parsers without flattening composites.
//!
//! ```
//! use byteorder::BE;
//! use hawser_buffer::BufferAllocator;
//!
//! # fn main() -> hawser_common::Result<()> {
//! let alloc = BufferAllocator::on_heap_pooled();
//! let mut buf = alloc.allocate(128)?;
//! buf.write_u32::<BE>(0xcafe_f00d)?;
//! assert_eq!(buf.read_u32::<BE>()?, 0xcafe_f00d);
//! buf.close()?;
//! # Ok(())
//! # }
//! ```

pub mod alloc;
pub mod buffer;
pub mod component;
pub mod cursor;
mod primitives;

pub use alloc::{BufferAllocator, MAX_ALLOCATION_SIZE};
pub use buffer::Buffer;
pub use component::{
    BackingArray, BackingArrayMut, Iteration, ReadableComponent, ReadableComponents,
    WritableComponent, WritableComponents,
};
pub use cursor::ByteCursor;

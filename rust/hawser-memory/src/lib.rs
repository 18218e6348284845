//! Backing storage for the Hawser buffer engine: raw memory regions, shared
//! ownership over them, and pooling.
//!
//! A [`MemoryRegion`] is a single owned allocation, either on the regular heap
//! or in page-granular memory obtained from the operating system. A
//! [`SharedRegion`] layers explicit reference counting on top, so that several
//! buffers can window disjoint parts of one allocation. When the last handle
//! to a pooled region drops, the region returns to its [`MemoryPool`] of
//! origin instead of being freed.

pub mod heap;
pub mod pool;
pub mod refcount;
pub mod region;

pub use pool::{MemoryPool, PoolConfig};
pub use region::{MemoryKind, MemoryRegion, SharedRegion};

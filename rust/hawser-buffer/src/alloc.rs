//! Buffer allocation strategies and composition.

use hawser_common::{Result, error::Error, verify_arg};
use hawser_memory::{MemoryKind, MemoryPool, MemoryRegion, PoolConfig};

use crate::buffer::Buffer;

/// Upper bound on the capacity of a single buffer, matching a 32-bit signed
/// address space.
pub const MAX_ALLOCATION_SIZE: usize = i32::MAX as usize;

/// A factory for [`Buffer`]s with a fixed placement and pooling strategy.
///
/// Cloning is cheap, and clones of a pooled allocator share one pool, so an
/// allocator can be handed to every part of a program that needs buffers.
/// The allocator does not keep the buffers it produced alive, and buffers
/// outlive the allocator value they came from.
#[derive(Clone, Debug)]
pub struct BufferAllocator {
    kind: MemoryKind,
    pool: Option<MemoryPool>,
}

impl BufferAllocator {
    /// Heap buffers, released straight back to the global allocator.
    pub fn on_heap_unpooled() -> BufferAllocator {
        BufferAllocator {
            kind: MemoryKind::Heap,
            pool: None,
        }
    }

    /// Native buffers, released straight back to the operating system.
    pub fn off_heap_unpooled() -> BufferAllocator {
        BufferAllocator {
            kind: MemoryKind::Native,
            pool: None,
        }
    }

    /// Heap buffers recycled through a pool with default bounds.
    pub fn on_heap_pooled() -> BufferAllocator {
        BufferAllocator {
            kind: MemoryKind::Heap,
            pool: Some(MemoryPool::default()),
        }
    }

    /// Native buffers recycled through a pool with default bounds.
    pub fn off_heap_pooled() -> BufferAllocator {
        BufferAllocator {
            kind: MemoryKind::Native,
            pool: Some(MemoryPool::new(PoolConfig::default())),
        }
    }

    /// A pooled allocator with explicit pool bounds.
    pub fn pooled_with_config(kind: MemoryKind, config: PoolConfig) -> BufferAllocator {
        BufferAllocator {
            kind,
            pool: Some(MemoryPool::new(config)),
        }
    }

    /// The memory placement this allocator produces.
    #[inline]
    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    /// Whether released storage is recycled through a pool.
    #[inline]
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// The pool backing this allocator, if any.
    pub fn pool(&self) -> Option<&MemoryPool> {
        self.pool.as_ref()
    }

    /// Allocates a writable buffer of exactly `size` bytes with both offsets
    /// at zero. `size` zero is legal and yields a buffer that can hold
    /// nothing.
    pub fn allocate(&self, size: usize) -> Result<Buffer> {
        verify_arg!(size, size <= MAX_ALLOCATION_SIZE);
        let region = match &self.pool {
            Some(pool) => pool.allocate(self.kind, size)?,
            None => MemoryRegion::allocate(self.kind, size)?.into_shared(),
        };
        Ok(Buffer::leaf(region, size, self.clone()))
    }

    /// Allocates a buffer holding a copy of `bytes`, fully written and
    /// readable from offset zero.
    pub fn copy_of(&self, bytes: &[u8]) -> Result<Buffer> {
        let mut buffer = self.allocate(bytes.len())?;
        buffer.write_bytes(bytes)?;
        Ok(buffer)
    }

    /// Builds a composite buffer that concatenates `buffers` in order,
    /// taking ownership of them. The composite's capacity, reader offset and
    /// writer offset are the sums over the constituents.
    ///
    /// The inputs must all be open and uniformly read-only or uniformly
    /// writable. Their offsets must also line up: once one constituent has
    /// unwritten capacity every later one must be entirely unwritten, and
    /// once one has readable bytes every later one must have its reader
    /// offset at zero. Anything else would bury a gap that relative reads
    /// and writes could never reach. An empty input sequence yields an empty
    /// writable composite.
    pub fn compose<I>(&self, buffers: I) -> Result<Buffer>
    where
        I: IntoIterator<Item = Buffer>,
    {
        let children: Vec<Buffer> = buffers.into_iter().collect();
        let mut read_only = None;
        let mut total = 0usize;
        let mut writes_ended = false;
        let mut reads_ended = false;
        for child in &children {
            child.ensure_open()?;
            let flag = child.is_read_only();
            if *read_only.get_or_insert(flag) != flag {
                return Err(Error::invalid_arg(
                    "buffers",
                    "cannot compose a mix of read-only and writable buffers",
                ));
            }
            if writes_ended && child.writer_offset() != 0 {
                return Err(Error::invalid_arg(
                    "buffers",
                    "buffer offsets would leave an unwritten gap",
                ));
            }
            if reads_ended && child.reader_offset() != 0 {
                return Err(Error::invalid_arg(
                    "buffers",
                    "buffer offsets would leave an unread gap",
                ));
            }
            writes_ended |= child.writer_offset() < child.capacity();
            reads_ended |= child.readable_bytes() != 0;
            total = total.saturating_add(child.capacity());
        }
        verify_arg!(buffers, total <= MAX_ALLOCATION_SIZE);
        Ok(Buffer::composite(
            children,
            read_only.unwrap_or(false),
            self.clone(),
        ))
    }
}

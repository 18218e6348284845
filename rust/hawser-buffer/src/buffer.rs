//! The `Buffer` handle: a linear byte range with reader and writer offsets,
//! backed by one memory region or by a sequence of constituent buffers.

use hawser_common::{Result, error::Error, verify_bounds};
use hawser_memory::SharedRegion;

use crate::alloc::{BufferAllocator, MAX_ALLOCATION_SIZE};

/// A mutable range of bytes with a reader offset and a writer offset.
///
/// The capacity is divided into three bands: bytes below the reader offset
/// have been consumed, bytes between the reader and writer offsets are
/// readable, and bytes from the writer offset to the capacity are writable.
/// The invariant `0 <= reader <= writer <= capacity` holds at all times.
///
/// A buffer is always in one of three lifecycle states. It starts *writable*,
/// can be demoted irrevocably to *read-only* with
/// [`make_read_only`](Buffer::make_read_only), and ends *closed* once
/// [`close`](Buffer::close), [`send`](Buffer::send) or `drop` retires it.
/// Operations on a closed buffer fail; plain state queries return zero.
///
/// Buffers are not internally synchronized. To move one to another thread,
/// transfer it with [`send`](Buffer::send) (or move the value itself); the
/// backing storage is released when the last buffer referring to it closes.
pub struct Buffer {
    pub(crate) repr: Repr,
    pub(crate) read_only: bool,
    pub(crate) alloc: BufferAllocator,
}

pub(crate) enum Repr {
    Leaf(Leaf),
    Composite(Vec<Buffer>),
    Closed,
}

/// A contiguous window `[base, base + cap)` into a shared region.
///
/// Every live leaf owns its window exclusively: splitting hands out disjoint
/// windows over the same region, so two handles never overlap. Mutable slices
/// derived from a leaf are therefore sound while the leaf is borrowed.
#[derive(Debug)]
pub(crate) struct Leaf {
    pub(crate) region: SharedRegion,
    pub(crate) base: usize,
    pub(crate) cap: usize,
    pub(crate) roff: usize,
    pub(crate) woff: usize,
}

impl Buffer {
    pub(crate) fn leaf(region: SharedRegion, len: usize, alloc: BufferAllocator) -> Buffer {
        Buffer {
            repr: Repr::Leaf(Leaf {
                region,
                base: 0,
                cap: len,
                roff: 0,
                woff: 0,
            }),
            read_only: false,
            alloc,
        }
    }

    pub(crate) fn composite(
        children: Vec<Buffer>,
        read_only: bool,
        alloc: BufferAllocator,
    ) -> Buffer {
        Buffer {
            repr: Repr::Composite(children),
            read_only,
            alloc,
        }
    }

    /// Total number of bytes this buffer can hold. Zero once closed.
    pub fn capacity(&self) -> usize {
        match &self.repr {
            Repr::Leaf(leaf) => leaf.cap,
            Repr::Composite(children) => children.iter().map(Buffer::capacity).sum(),
            Repr::Closed => 0,
        }
    }

    /// Offset of the first readable byte.
    pub fn reader_offset(&self) -> usize {
        match &self.repr {
            Repr::Leaf(leaf) => leaf.roff,
            Repr::Composite(children) => children.iter().map(Buffer::reader_offset).sum(),
            Repr::Closed => 0,
        }
    }

    /// Offset of the first writable byte.
    pub fn writer_offset(&self) -> usize {
        match &self.repr {
            Repr::Leaf(leaf) => leaf.woff,
            Repr::Composite(children) => children.iter().map(Buffer::writer_offset).sum(),
            Repr::Closed => 0,
        }
    }

    /// Bytes between the reader and writer offsets.
    #[inline]
    pub fn readable_bytes(&self) -> usize {
        self.writer_offset() - self.reader_offset()
    }

    /// Bytes between the writer offset and the capacity.
    #[inline]
    pub fn writable_bytes(&self) -> usize {
        self.capacity() - self.writer_offset()
    }

    /// Whether the buffer has been demoted to read-only.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether the buffer has been closed or sent away.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self.repr, Repr::Closed)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::closed())
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_writable_state(&self) -> Result<()> {
        self.ensure_open()?;
        if self.read_only {
            Err(Error::read_only())
        } else {
            Ok(())
        }
    }

    /// Moves the reader offset to an absolute position within the readable
    /// range. The position must not exceed the writer offset, and for a
    /// composite it must be reachable given the offsets of the constituents.
    pub fn set_reader_offset(&mut self, offset: usize) -> Result<()> {
        self.ensure_open()?;
        verify_bounds!(reader_offset, offset <= self.writer_offset());
        if !self.reader_offset_feasible(offset) {
            return Err(Error::out_of_bounds(
                "reader_offset",
                "offset does not line up with the constituent writer offsets",
            ));
        }
        self.apply_reader_offset(offset);
        Ok(())
    }

    /// Moves the writer offset to an absolute position between the reader
    /// offset and the capacity. Fails on a read-only buffer.
    pub fn set_writer_offset(&mut self, offset: usize) -> Result<()> {
        self.ensure_writable_state()?;
        verify_bounds!(
            writer_offset,
            self.reader_offset() <= offset && offset <= self.capacity()
        );
        if !self.writer_offset_feasible(offset) {
            return Err(Error::out_of_bounds(
                "writer_offset",
                "offset does not line up with the constituent reader offsets",
            ));
        }
        self.apply_writer_offset(offset);
        Ok(())
    }

    /// Rewinds the reader offset to zero, and the writer offset as well
    /// unless the buffer is read-only.
    pub fn reset_offsets(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.apply_reader_offset(0);
        if !self.read_only {
            self.apply_writer_offset(0);
        }
        Ok(())
    }

    fn reader_offset_feasible(&self, offset: usize) -> bool {
        match &self.repr {
            Repr::Leaf(leaf) => offset <= leaf.woff,
            Repr::Composite(children) => {
                let mut remaining = offset;
                children.iter().all(|child| {
                    let target = remaining.min(child.capacity());
                    remaining -= target;
                    child.reader_offset_feasible(target)
                })
            }
            Repr::Closed => false,
        }
    }

    fn writer_offset_feasible(&self, offset: usize) -> bool {
        match &self.repr {
            Repr::Leaf(leaf) => offset >= leaf.roff,
            Repr::Composite(children) => {
                let mut remaining = offset;
                children.iter().all(|child| {
                    let target = remaining.min(child.capacity());
                    remaining -= target;
                    child.writer_offset_feasible(target)
                })
            }
            Repr::Closed => false,
        }
    }

    pub(crate) fn apply_reader_offset(&mut self, offset: usize) {
        match &mut self.repr {
            Repr::Leaf(leaf) => leaf.roff = offset,
            Repr::Composite(children) => {
                let mut remaining = offset;
                for child in children {
                    let target = remaining.min(child.capacity());
                    child.apply_reader_offset(target);
                    remaining -= target;
                }
            }
            Repr::Closed => (),
        }
    }

    pub(crate) fn apply_writer_offset(&mut self, offset: usize) {
        match &mut self.repr {
            Repr::Leaf(leaf) => leaf.woff = offset,
            Repr::Composite(children) => {
                let mut remaining = offset;
                for child in children {
                    let target = remaining.min(child.capacity());
                    child.apply_writer_offset(target);
                    remaining -= target;
                }
            }
            Repr::Closed => (),
        }
    }

    /// Demotes the buffer to read-only. The demotion is permanent and
    /// extends to every buffer later split off from this one.
    pub fn make_read_only(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.apply_read_only();
        Ok(())
    }

    fn apply_read_only(&mut self) {
        self.read_only = true;
        if let Repr::Composite(children) = &mut self.repr {
            for child in children {
                child.apply_read_only();
            }
        }
    }

    /// Overwrites the entire capacity with `value` without touching the
    /// offsets.
    pub fn fill(&mut self, value: u8) -> Result<()> {
        self.ensure_writable_state()?;
        self.fill_unchecked(value);
        Ok(())
    }

    fn fill_unchecked(&mut self, value: u8) {
        match &mut self.repr {
            Repr::Leaf(leaf) => {
                unsafe { leaf.region.slice_mut(leaf.base, leaf.cap) }.fill(value);
            }
            Repr::Composite(children) => {
                for child in children {
                    child.fill_unchecked(value);
                }
            }
            Repr::Closed => (),
        }
    }

    /// Splits at the writer offset: everything written so far moves into the
    /// returned buffer, everything writable stays in `self`.
    pub fn split(&mut self) -> Result<Buffer> {
        let offset = self.writer_offset();
        self.split_at(offset)
    }

    /// Splits the buffer in two at `offset`. The returned buffer covers
    /// `[0, offset)` and `self` shrinks to the remainder; both keep their
    /// shares of the reader and writer offsets, reference the same storage
    /// without copying, and retain the read-only flag.
    pub fn split_at(&mut self, offset: usize) -> Result<Buffer> {
        self.ensure_open()?;
        verify_bounds!(split_at, offset <= self.capacity());
        let front = match &mut self.repr {
            Repr::Leaf(leaf) => {
                let head = Leaf {
                    region: leaf.region.clone(),
                    base: leaf.base,
                    cap: offset,
                    roff: leaf.roff.min(offset),
                    woff: leaf.woff.min(offset),
                };
                leaf.base += offset;
                leaf.cap -= offset;
                leaf.roff = leaf.roff.saturating_sub(offset);
                leaf.woff = leaf.woff.saturating_sub(offset);
                Repr::Leaf(head)
            }
            Repr::Composite(children) => {
                let kids = std::mem::take(children);
                let mut head = Vec::new();
                let mut rest = Vec::new();
                let mut remaining = offset;
                for mut child in kids {
                    if remaining == 0 {
                        rest.push(child);
                        continue;
                    }
                    let cap = child.capacity();
                    if cap <= remaining {
                        remaining -= cap;
                        head.push(child);
                    } else {
                        head.push(child.split_at(remaining)?);
                        remaining = 0;
                        rest.push(child);
                    }
                }
                *children = rest;
                Repr::Composite(head)
            }
            Repr::Closed => return Err(Error::closed()),
        };
        Ok(Buffer {
            repr: front,
            read_only: self.read_only,
            alloc: self.alloc.clone(),
        })
    }

    /// Appends `extension` to a composite buffer, growing its capacity.
    ///
    /// Fails on a leaf. The extension must match the read-only state of the
    /// composite, and its offsets must continue where the composite's leave
    /// off without creating an unread or unwritten gap in the middle.
    pub fn extend_with(&mut self, extension: Buffer) -> Result<()> {
        self.ensure_open()?;
        extension.ensure_open()?;
        if !matches!(self.repr, Repr::Composite(_)) {
            return Err(Error::invalid_operation("extend_with"));
        }
        if self.read_only != extension.read_only {
            return Err(Error::invalid_arg(
                "extension",
                "cannot mix read-only and writable buffers",
            ));
        }
        if self.writer_offset() < self.capacity() && extension.writer_offset() != 0 {
            return Err(Error::invalid_arg(
                "extension",
                "extension offsets would leave an unwritten gap",
            ));
        }
        if self.readable_bytes() != 0 && extension.reader_offset() != 0 {
            return Err(Error::invalid_arg(
                "extension",
                "extension offsets would leave an unread gap",
            ));
        }
        if self.capacity().saturating_add(extension.capacity()) > MAX_ALLOCATION_SIZE {
            return Err(Error::invalid_arg(
                "extension",
                "extension would exceed the maximum buffer capacity",
            ));
        }
        if let Repr::Composite(children) = &mut self.repr {
            children.push(extension);
        }
        Ok(())
    }

    /// Allocates a fresh buffer and copies the readable bytes into it. The
    /// copy is writable even when the source is read-only, with the copied
    /// bytes readable from offset zero.
    pub fn copy(&self) -> Result<Buffer> {
        self.ensure_open()?;
        let mut copy = self.alloc.allocate(self.readable_bytes())?;
        let mut slices = Vec::new();
        self.collect_readable(&mut slices);
        for slice in slices {
            copy.write_bytes(slice)?;
        }
        Ok(copy)
    }

    /// Detaches the contents into a fresh handle fit for another thread,
    /// leaving `self` closed. Offsets, contents and the read-only state
    /// carry over; the backing storage is not copied.
    pub fn send(&mut self) -> Result<Buffer> {
        self.ensure_open()?;
        let repr = std::mem::replace(&mut self.repr, Repr::Closed);
        Ok(Buffer {
            repr,
            read_only: self.read_only,
            alloc: self.alloc.clone(),
        })
    }

    /// Closes the buffer, dropping its claim on the backing storage. Closing
    /// an already-closed buffer fails.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.repr = Repr::Closed;
        Ok(())
    }

    /// Number of constituent memory ranges. A non-composite buffer counts as
    /// one regardless of its offsets.
    pub fn count_components(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.leaves_total())
    }

    /// Number of constituents with at least one readable byte.
    pub fn count_readable_components(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.leaves_readable())
    }

    /// Number of constituents with at least one writable byte. Fails on a
    /// read-only buffer, which cannot be written through at all.
    pub fn count_writable_components(&self) -> Result<usize> {
        self.ensure_writable_state()?;
        Ok(self.leaves_writable())
    }

    fn leaves_total(&self) -> usize {
        match &self.repr {
            Repr::Leaf(_) => 1,
            Repr::Composite(children) => children.iter().map(Buffer::leaves_total).sum(),
            Repr::Closed => 0,
        }
    }

    fn leaves_readable(&self) -> usize {
        match &self.repr {
            Repr::Leaf(leaf) => (leaf.roff < leaf.woff) as usize,
            Repr::Composite(children) => children.iter().map(Buffer::leaves_readable).sum(),
            Repr::Closed => 0,
        }
    }

    fn leaves_writable(&self) -> usize {
        match &self.repr {
            Repr::Leaf(leaf) => (leaf.woff < leaf.cap) as usize,
            Repr::Composite(children) => children.iter().map(Buffer::leaves_writable).sum(),
            Repr::Closed => 0,
        }
    }

    pub(crate) fn collect_readable<'a>(&'a self, out: &mut Vec<&'a [u8]>) {
        match &self.repr {
            Repr::Leaf(leaf) => {
                if leaf.roff < leaf.woff {
                    out.push(unsafe {
                        leaf.region.slice(leaf.base + leaf.roff, leaf.woff - leaf.roff)
                    });
                }
            }
            Repr::Composite(children) => {
                for child in children {
                    child.collect_readable(out);
                }
            }
            Repr::Closed => (),
        }
    }
}

/// Buffers compare by their readable bytes alone. Capacity, offsets,
/// structure and memory kind do not participate.
impl PartialEq for Buffer {
    fn eq(&self, other: &Buffer) -> bool {
        if self.readable_bytes() != other.readable_bytes() {
            return false;
        }
        let mut ours = Vec::new();
        self.collect_readable(&mut ours);
        let mut theirs = Vec::new();
        other.collect_readable(&mut theirs);
        ours.iter()
            .flat_map(|s| s.iter())
            .eq(theirs.iter().flat_map(|s| s.iter()))
    }
}

impl Eq for Buffer {}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match &self.repr {
            Repr::Leaf(_) => "leaf",
            Repr::Composite(_) => "composite",
            Repr::Closed => "closed",
        };
        f.debug_struct("Buffer")
            .field("shape", &shape)
            .field("capacity", &self.capacity())
            .field("reader_offset", &self.reader_offset())
            .field("writer_offset", &self.writer_offset())
            .field("read_only", &self.read_only)
            .finish()
    }
}

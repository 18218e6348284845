//! Zero-copy access to the constituent memory ranges of a buffer.
//!
//! A buffer is a logical sequence of *components*, each one a contiguous
//! range of memory. Iteration visits the components with readable (or
//! writable) bytes in order, either through a callback or through a
//! step-driven iterator, and hands out typed views instead of raw parts.

use std::ptr::NonNull;

use hawser_common::{Result, verify_bounds};
use hawser_memory::MemoryKind;

use crate::buffer::{Buffer, Leaf, Repr};
use crate::cursor::ByteCursor;

/// Outcome of a callback-driven component iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Iteration {
    /// Every component was visited and asked to continue; carries the number
    /// of components visited.
    Completed(usize),
    /// The component at the carried zero-based index declined to continue.
    /// Components after it were not visited, and any offset advances made by
    /// earlier components are kept.
    StoppedEarly(usize),
}

impl Iteration {
    pub fn is_complete(&self) -> bool {
        matches!(self, Iteration::Completed(_))
    }
}

/// Heap storage underlying a component: the whole backing array plus the
/// position of the component's range within it.
pub struct BackingArray<'a> {
    pub array: &'a [u8],
    pub offset: usize,
    pub len: usize,
}

/// Mutable counterpart of [`BackingArray`].
pub struct BackingArrayMut<'a> {
    pub array: &'a mut [u8],
    pub offset: usize,
    pub len: usize,
}

/// A view over the readable bytes of one component.
///
/// The immutable slice is always available. A writable view over the same
/// bytes is an optional capability, present only when the buffer the
/// component came from permits writes.
pub struct ReadableComponent<'a> {
    leaf: &'a mut Leaf,
    writable: bool,
}

impl ReadableComponent<'_> {
    /// Bytes this component has available to read.
    #[inline]
    pub fn readable_bytes(&self) -> usize {
        self.leaf.woff - self.leaf.roff
    }

    /// The readable bytes of this component.
    pub fn as_slice(&self) -> &[u8] {
        unsafe {
            self.leaf
                .region
                .slice(self.leaf.base + self.leaf.roff, self.readable_bytes())
        }
    }

    /// Address of the first readable byte for native storage, `None` for
    /// heap storage.
    pub fn native_address(&self) -> Option<NonNull<u8>> {
        self.leaf
            .region
            .native_address()
            .map(|addr| unsafe { addr.add(self.leaf.base + self.leaf.roff) })
    }

    /// The heap array backing this component, `None` for native storage.
    pub fn backing_array(&self) -> Option<BackingArray<'_>> {
        if self.leaf.region.kind() != MemoryKind::Heap {
            return None;
        }
        Some(BackingArray {
            array: unsafe { self.leaf.region.slice(self.leaf.base, self.leaf.cap) },
            offset: self.leaf.roff,
            len: self.readable_bytes(),
        })
    }

    /// A mutable view over the readable bytes, absent when the owning buffer
    /// is read-only.
    pub fn writable_view(&mut self) -> Option<&mut [u8]> {
        if !self.writable {
            return None;
        }
        let len = self.readable_bytes();
        Some(unsafe {
            self.leaf
                .region
                .slice_mut(self.leaf.base + self.leaf.roff, len)
        })
    }

    /// Consumes `n` bytes of this component, advancing the owning buffer's
    /// reader offset. The advance persists however the iteration ends.
    pub fn skip_readable_bytes(&mut self, n: usize) -> Result<()> {
        verify_bounds!(skip_readable_bytes, n <= self.readable_bytes());
        self.leaf.roff += n;
        Ok(())
    }

    /// Opens a forward cursor over the readable bytes of this component
    /// only. The cursor does not move any offsets.
    pub fn open_cursor(&self) -> ByteCursor<'_> {
        ByteCursor::forward(vec![self.as_slice()])
    }
}

/// A view over the writable bytes of one component.
pub struct WritableComponent<'a> {
    leaf: &'a mut Leaf,
}

impl WritableComponent<'_> {
    /// Bytes this component has room to accept.
    #[inline]
    pub fn writable_bytes(&self) -> usize {
        self.leaf.cap - self.leaf.woff
    }

    /// The writable bytes of this component.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.writable_bytes();
        unsafe {
            self.leaf
                .region
                .slice_mut(self.leaf.base + self.leaf.woff, len)
        }
    }

    /// Address of the first writable byte for native storage, `None` for
    /// heap storage.
    pub fn native_address(&self) -> Option<NonNull<u8>> {
        self.leaf
            .region
            .native_address()
            .map(|addr| unsafe { addr.add(self.leaf.base + self.leaf.woff) })
    }

    /// Mutable access to the heap array backing this component, `None` for
    /// native storage.
    pub fn backing_array_mut(&mut self) -> Option<BackingArrayMut<'_>> {
        if self.leaf.region.kind() != MemoryKind::Heap {
            return None;
        }
        let offset = self.leaf.woff;
        let len = self.writable_bytes();
        Some(BackingArrayMut {
            array: unsafe { self.leaf.region.slice_mut(self.leaf.base, self.leaf.cap) },
            offset,
            len,
        })
    }

    /// Commits `n` written bytes, advancing the owning buffer's writer
    /// offset. The advance persists however the iteration ends.
    pub fn skip_writable_bytes(&mut self, n: usize) -> Result<()> {
        verify_bounds!(skip_writable_bytes, n <= self.writable_bytes());
        self.leaf.woff += n;
        Ok(())
    }
}

fn gather<'a>(buffer: &'a mut Buffer, out: &mut Vec<&'a mut Leaf>) {
    match &mut buffer.repr {
        Repr::Leaf(leaf) => out.push(leaf),
        Repr::Composite(children) => {
            for child in children {
                gather(child, out);
            }
        }
        Repr::Closed => (),
    }
}

impl Buffer {
    /// Calls `f` for each component with readable bytes, in order, with a
    /// zero-based index. `f` returning `false` stops the iteration early.
    ///
    /// Bytes consumed through
    /// [`skip_readable_bytes`](ReadableComponent::skip_readable_bytes) stay
    /// consumed even when the iteration stops early.
    pub fn for_each_readable<F>(&mut self, mut f: F) -> Result<Iteration>
    where
        F: FnMut(usize, &mut ReadableComponent<'_>) -> bool,
    {
        self.ensure_open()?;
        let writable = !self.is_read_only();
        let mut leaves = Vec::new();
        gather(self, &mut leaves);
        let mut index = 0;
        for leaf in leaves {
            if leaf.roff == leaf.woff {
                continue;
            }
            let mut component = ReadableComponent { leaf, writable };
            if !f(index, &mut component) {
                return Ok(Iteration::StoppedEarly(index));
            }
            index += 1;
        }
        Ok(Iteration::Completed(index))
    }

    /// Calls `f` for each component with writable bytes, in order, with a
    /// zero-based index. `f` returning `false` stops the iteration early.
    /// Fails on a read-only buffer.
    pub fn for_each_writable<F>(&mut self, mut f: F) -> Result<Iteration>
    where
        F: FnMut(usize, &mut WritableComponent<'_>) -> bool,
    {
        self.ensure_writable_state()?;
        let mut leaves = Vec::new();
        gather(self, &mut leaves);
        let mut index = 0;
        for leaf in leaves {
            if leaf.woff == leaf.cap {
                continue;
            }
            let mut component = WritableComponent { leaf };
            if !f(index, &mut component) {
                return Ok(Iteration::StoppedEarly(index));
            }
            index += 1;
        }
        Ok(Iteration::Completed(index))
    }

    /// Step-driven counterpart of [`for_each_readable`](Buffer::for_each_readable):
    /// an iterator over the components with readable bytes.
    pub fn readable_components(&mut self) -> Result<ReadableComponents<'_>> {
        self.ensure_open()?;
        let writable = !self.is_read_only();
        let mut leaves = Vec::new();
        gather(self, &mut leaves);
        Ok(ReadableComponents {
            leaves: leaves.into_iter(),
            writable,
        })
    }

    /// Step-driven counterpart of [`for_each_writable`](Buffer::for_each_writable):
    /// an iterator over the components with writable bytes. Fails on a
    /// read-only buffer.
    pub fn writable_components(&mut self) -> Result<WritableComponents<'_>> {
        self.ensure_writable_state()?;
        let mut leaves = Vec::new();
        gather(self, &mut leaves);
        Ok(WritableComponents {
            leaves: leaves.into_iter(),
        })
    }
}

/// Iterator over the readable components of a buffer.
#[derive(Debug)]
pub struct ReadableComponents<'a> {
    leaves: std::vec::IntoIter<&'a mut Leaf>,
    writable: bool,
}

impl<'a> ReadableComponents<'a> {
    /// The first readable component, `None` when nothing is readable.
    /// Equivalent to the initial [`next`](Iterator::next) call.
    pub fn first(&mut self) -> Option<ReadableComponent<'a>> {
        self.next()
    }
}

impl<'a> Iterator for ReadableComponents<'a> {
    type Item = ReadableComponent<'a>;

    fn next(&mut self) -> Option<ReadableComponent<'a>> {
        loop {
            let leaf = self.leaves.next()?;
            if leaf.roff < leaf.woff {
                return Some(ReadableComponent {
                    leaf,
                    writable: self.writable,
                });
            }
        }
    }
}

/// Iterator over the writable components of a buffer.
#[derive(Debug)]
pub struct WritableComponents<'a> {
    leaves: std::vec::IntoIter<&'a mut Leaf>,
}

impl<'a> WritableComponents<'a> {
    /// The first writable component, `None` when nothing is writable.
    /// Equivalent to the initial [`next`](Iterator::next) call.
    pub fn first(&mut self) -> Option<WritableComponent<'a>> {
        self.next()
    }
}

impl<'a> Iterator for WritableComponents<'a> {
    type Item = WritableComponent<'a>;

    fn next(&mut self) -> Option<WritableComponent<'a>> {
        loop {
            let leaf = self.leaves.next()?;
            if leaf.woff < leaf.cap {
                return Some(WritableComponent { leaf });
            }
        }
    }
}

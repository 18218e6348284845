//! Sequential byte cursors over readable ranges.

use hawser_common::Result;

use crate::buffer::Buffer;

/// A single-pass cursor over the readable bytes of a buffer or component.
///
/// A cursor never moves the offsets of the buffer it was opened on, and it
/// cannot be rewound; open a new one to traverse again. It also implements
/// [`Iterator`] for use with `for` loops and adapters.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    slices: Vec<&'a [u8]>,
    current: usize,
    pos: usize,
    remaining: usize,
    last: u8,
    reverse: bool,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn forward(slices: Vec<&'a [u8]>) -> ByteCursor<'a> {
        let remaining = slices.iter().map(|s| s.len()).sum();
        ByteCursor {
            slices,
            current: 0,
            pos: 0,
            remaining,
            last: 0,
            reverse: false,
        }
    }

    pub(crate) fn backward(mut slices: Vec<&'a [u8]>) -> ByteCursor<'a> {
        slices.reverse();
        let remaining = slices.iter().map(|s| s.len()).sum();
        let pos = slices.first().map_or(0, |s| s.len());
        ByteCursor {
            slices,
            current: 0,
            pos,
            remaining,
            last: 0,
            reverse: true,
        }
    }

    /// Advances to the next byte, reporting whether one remained.
    pub fn read_byte(&mut self) -> bool {
        self.next().is_some()
    }

    /// The byte most recently traversed by a successful
    /// [`read_byte`](ByteCursor::read_byte); zero before the first one.
    #[inline]
    pub fn get_byte(&self) -> u8 {
        self.last
    }

    /// Bytes the cursor has not traversed yet.
    #[inline]
    pub fn bytes_left(&self) -> usize {
        self.remaining
    }
}

impl Iterator for ByteCursor<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        while self.current < self.slices.len() {
            let slice = self.slices[self.current];
            if self.reverse {
                if self.pos > 0 {
                    self.pos -= 1;
                    self.remaining -= 1;
                    self.last = slice[self.pos];
                    return Some(self.last);
                }
            } else if self.pos < slice.len() {
                self.last = slice[self.pos];
                self.pos += 1;
                self.remaining -= 1;
                return Some(self.last);
            }
            self.current += 1;
            self.pos = if self.reverse {
                self.slices.get(self.current).map_or(0, |s| s.len())
            } else {
                0
            };
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ByteCursor<'_> {}

impl Buffer {
    /// Opens a cursor that traverses the readable bytes from the reader
    /// offset towards the writer offset.
    pub fn open_cursor(&self) -> Result<ByteCursor<'_>> {
        self.ensure_open()?;
        let mut slices = Vec::new();
        self.collect_readable(&mut slices);
        Ok(ByteCursor::forward(slices))
    }

    /// Opens a cursor that traverses the readable bytes in reverse, from the
    /// last readable byte back to the reader offset.
    pub fn open_reverse_cursor(&self) -> Result<ByteCursor<'_>> {
        self.ensure_open()?;
        let mut slices = Vec::new();
        self.collect_readable(&mut slices);
        Ok(ByteCursor::backward(slices))
    }
}

#[cfg(test)]
mod tests {
    use crate::alloc::BufferAllocator;

    #[test]
    fn test_forward_cursor_yields_readable_bytes() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.copy_of(b"abcdef").unwrap();
        buffer.set_reader_offset(2).unwrap();

        let mut cursor = buffer.open_cursor().unwrap();
        assert_eq!(cursor.bytes_left(), 4);
        assert_eq!(cursor.get_byte(), 0);
        assert!(cursor.read_byte());
        assert_eq!(cursor.get_byte(), b'c');
        assert_eq!(cursor.bytes_left(), 3);

        let rest: Vec<u8> = cursor.collect();
        assert_eq!(rest, b"def");

        assert_eq!(buffer.reader_offset(), 2);
        assert_eq!(buffer.readable_bytes(), 4);
    }

    #[test]
    fn test_exhausted_cursor_stays_exhausted() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let buffer = alloc.copy_of(b"x").unwrap();
        let mut cursor = buffer.open_cursor().unwrap();
        assert!(cursor.read_byte());
        assert!(!cursor.read_byte());
        assert!(!cursor.read_byte());
        assert_eq!(cursor.bytes_left(), 0);
        assert_eq!(cursor.get_byte(), b'x');
    }

    #[test]
    fn test_reverse_cursor_yields_bytes_backwards() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let buffer = alloc.copy_of(b"abc").unwrap();
        let collected: Vec<u8> = buffer.open_reverse_cursor().unwrap().collect();
        assert_eq!(collected, b"cba");
    }

    #[test]
    fn test_cursors_span_composite_boundaries() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let buffer = alloc
            .compose([
                alloc.copy_of(b"ab").unwrap(),
                alloc.copy_of(b"cd").unwrap(),
                alloc.copy_of(b"ef").unwrap(),
            ])
            .unwrap();

        let forward: Vec<u8> = buffer.open_cursor().unwrap().collect();
        assert_eq!(forward, b"abcdef");

        let mut cursor = buffer.open_reverse_cursor().unwrap();
        assert_eq!(cursor.bytes_left(), 6);
        let backward: Vec<u8> = cursor.by_ref().collect();
        assert_eq!(backward, b"fedcba");
        assert_eq!(cursor.bytes_left(), 0);
    }

    #[test]
    fn test_cursor_over_empty_readable_range() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let buffer = alloc.allocate(8).unwrap();
        let mut cursor = buffer.open_cursor().unwrap();
        assert_eq!(cursor.bytes_left(), 0);
        assert!(!cursor.read_byte());
        assert_eq!(cursor.get_byte(), 0);

        let mut reverse = buffer.open_reverse_cursor().unwrap();
        assert!(!reverse.read_byte());
    }

    #[test]
    fn test_cursor_open_fails_when_closed() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.copy_of(b"abc").unwrap();
        buffer.close().unwrap();
        assert!(buffer.open_cursor().unwrap_err().is_closed());
        assert!(buffer.open_reverse_cursor().unwrap_err().is_closed());
    }

    #[test]
    fn test_cursor_len_matches_bytes_left() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let buffer = alloc.copy_of(b"0123456789").unwrap();
        let mut cursor = buffer.open_cursor().unwrap();
        assert_eq!(cursor.len(), 10);
        cursor.read_byte();
        cursor.read_byte();
        assert_eq!(cursor.len(), cursor.bytes_left());
        assert_eq!(cursor.len(), 8);
    }
}

//! Relative and absolute primitive accessors.
//!
//! Relative reads and writes move the corresponding offset and are bounded by
//! the readable and writable byte counts. Absolute accessors address the full
//! capacity and leave the offsets alone. Multi-byte accessors take the byte
//! order as a type parameter and assemble values through a small stack
//! buffer, so a value that straddles constituent boundaries costs the same
//! code path as a contiguous one.

use byteorder::ByteOrder;
use hawser_common::{Result, verify_bounds};

use crate::buffer::{Buffer, Repr};

impl Buffer {
    /// Copies `dst.len()` readable bytes into `dst`, advancing the reader
    /// offset past them.
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        verify_bounds!(read_bytes, dst.len() <= self.readable_bytes());
        self.read_into(dst);
        Ok(())
    }

    /// Copies all of `src` into the writable range, advancing the writer
    /// offset past it.
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.ensure_writable_state()?;
        verify_bounds!(write_bytes, src.len() <= self.writable_bytes());
        self.write_from(src);
        Ok(())
    }

    /// Copies bytes starting at the absolute `offset` into `dst` without
    /// moving the reader offset.
    pub fn get_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        verify_bounds!(offset, offset <= self.capacity());
        verify_bounds!(offset, dst.len() <= self.capacity() - offset);
        self.copy_out(offset, dst);
        Ok(())
    }

    /// Copies `src` to the absolute `offset` without moving the writer
    /// offset.
    pub fn set_bytes(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        self.ensure_writable_state()?;
        verify_bounds!(offset, offset <= self.capacity());
        verify_bounds!(offset, src.len() <= self.capacity() - offset);
        self.copy_in(offset, src);
        Ok(())
    }

    fn read_into(&mut self, dst: &mut [u8]) {
        match &mut self.repr {
            Repr::Leaf(leaf) => {
                let src = unsafe { leaf.region.slice(leaf.base + leaf.roff, dst.len()) };
                dst.copy_from_slice(src);
                leaf.roff += dst.len();
            }
            Repr::Composite(children) => {
                let mut pos = 0;
                for child in children {
                    if pos == dst.len() {
                        break;
                    }
                    let take = child.readable_bytes().min(dst.len() - pos);
                    if take > 0 {
                        child.read_into(&mut dst[pos..pos + take]);
                        pos += take;
                    }
                }
            }
            Repr::Closed => (),
        }
    }

    fn write_from(&mut self, src: &[u8]) {
        match &mut self.repr {
            Repr::Leaf(leaf) => {
                unsafe { leaf.region.slice_mut(leaf.base + leaf.woff, src.len()) }
                    .copy_from_slice(src);
                leaf.woff += src.len();
            }
            Repr::Composite(children) => {
                let mut pos = 0;
                for child in children {
                    if pos == src.len() {
                        break;
                    }
                    let take = child.writable_bytes().min(src.len() - pos);
                    if take > 0 {
                        child.write_from(&src[pos..pos + take]);
                        pos += take;
                    }
                }
            }
            Repr::Closed => (),
        }
    }

    fn copy_out(&self, offset: usize, dst: &mut [u8]) {
        match &self.repr {
            Repr::Leaf(leaf) => {
                dst.copy_from_slice(unsafe {
                    leaf.region.slice(leaf.base + offset, dst.len())
                });
            }
            Repr::Composite(children) => {
                let mut offset = offset;
                let mut pos = 0;
                for child in children {
                    if pos == dst.len() {
                        break;
                    }
                    let cap = child.capacity();
                    if offset >= cap {
                        offset -= cap;
                        continue;
                    }
                    let take = (cap - offset).min(dst.len() - pos);
                    child.copy_out(offset, &mut dst[pos..pos + take]);
                    pos += take;
                    offset = 0;
                }
            }
            Repr::Closed => (),
        }
    }

    fn copy_in(&mut self, offset: usize, src: &[u8]) {
        match &mut self.repr {
            Repr::Leaf(leaf) => {
                unsafe { leaf.region.slice_mut(leaf.base + offset, src.len()) }
                    .copy_from_slice(src);
            }
            Repr::Composite(children) => {
                let mut offset = offset;
                let mut pos = 0;
                for child in children {
                    if pos == src.len() {
                        break;
                    }
                    let cap = child.capacity();
                    if offset >= cap {
                        offset -= cap;
                        continue;
                    }
                    let take = (cap - offset).min(src.len() - pos);
                    child.copy_in(offset, &src[pos..pos + take]);
                    pos += take;
                    offset = 0;
                }
            }
            Repr::Closed => (),
        }
    }

    /// Reads one byte at the reader offset, advancing it.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut raw = [0u8; 1];
        self.read_bytes(&mut raw)?;
        Ok(raw[0])
    }

    /// Writes one byte at the writer offset, advancing it.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Reads one byte at an absolute offset.
    pub fn get_u8(&self, offset: usize) -> Result<u8> {
        let mut raw = [0u8; 1];
        self.get_bytes(offset, &mut raw)?;
        Ok(raw[0])
    }

    /// Writes one byte at an absolute offset.
    pub fn set_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.set_bytes(offset, &[value])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn get_i8(&self, offset: usize) -> Result<i8> {
        Ok(self.get_u8(offset)? as i8)
    }

    pub fn set_i8(&mut self, offset: usize, value: i8) -> Result<()> {
        self.set_u8(offset, value as u8)
    }
}

macro_rules! accessors {
    ($ty:ty, $read:ident, $write:ident, $get:ident, $set:ident) => {
        impl Buffer {
            #[doc = concat!("Reads a `", stringify!($ty), "` at the reader offset, advancing it.")]
            pub fn $read<B: ByteOrder>(&mut self) -> Result<$ty> {
                let mut raw = [0u8; size_of::<$ty>()];
                self.read_bytes(&mut raw)?;
                Ok(B::$read(&raw))
            }

            #[doc = concat!("Writes a `", stringify!($ty), "` at the writer offset, advancing it.")]
            pub fn $write<B: ByteOrder>(&mut self, value: $ty) -> Result<()> {
                let mut raw = [0u8; size_of::<$ty>()];
                B::$write(&mut raw, value);
                self.write_bytes(&raw)
            }

            #[doc = concat!("Reads a `", stringify!($ty), "` at an absolute offset.")]
            pub fn $get<B: ByteOrder>(&self, offset: usize) -> Result<$ty> {
                let mut raw = [0u8; size_of::<$ty>()];
                self.get_bytes(offset, &mut raw)?;
                Ok(B::$read(&raw))
            }

            #[doc = concat!("Writes a `", stringify!($ty), "` at an absolute offset.")]
            pub fn $set<B: ByteOrder>(&mut self, offset: usize, value: $ty) -> Result<()> {
                let mut raw = [0u8; size_of::<$ty>()];
                B::$write(&mut raw, value);
                self.set_bytes(offset, &raw)
            }
        }
    };
}

accessors!(u16, read_u16, write_u16, get_u16, set_u16);
accessors!(i16, read_i16, write_i16, get_i16, set_i16);
accessors!(u32, read_u32, write_u32, get_u32, set_u32);
accessors!(i32, read_i32, write_i32, get_i32, set_i32);
accessors!(u64, read_u64, write_u64, get_u64, set_u64);
accessors!(i64, read_i64, write_i64, get_i64, set_i64);
accessors!(f32, read_f32, write_f32, get_f32, set_f32);
accessors!(f64, read_f64, write_f64, get_f64, set_f64);

#[cfg(test)]
mod tests {
    use byteorder::{BE, LE};

    use crate::alloc::BufferAllocator;

    #[test]
    fn test_byte_round_trip() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.allocate(4).unwrap();
        buffer.write_u8(0xfe).unwrap();
        buffer.write_i8(-2).unwrap();
        assert_eq!(buffer.writer_offset(), 2);
        assert_eq!(buffer.read_u8().unwrap(), 0xfe);
        assert_eq!(buffer.read_i8().unwrap(), -2);
        assert_eq!(buffer.reader_offset(), 2);
    }

    #[test]
    fn test_multi_byte_round_trips() {
        let alloc = BufferAllocator::off_heap_unpooled();
        let mut buffer = alloc.allocate(32).unwrap();
        buffer.write_u16::<BE>(0xcafe).unwrap();
        buffer.write_i16::<LE>(-512).unwrap();
        buffer.write_u32::<BE>(0xdead_beef).unwrap();
        buffer.write_u64::<LE>(0x0123_4567_89ab_cdef).unwrap();
        buffer.write_i64::<BE>(i64::MIN).unwrap();
        buffer.write_f64::<LE>(6.25).unwrap();

        assert_eq!(buffer.read_u16::<BE>().unwrap(), 0xcafe);
        assert_eq!(buffer.read_i16::<LE>().unwrap(), -512);
        assert_eq!(buffer.read_u32::<BE>().unwrap(), 0xdead_beef);
        assert_eq!(buffer.read_u64::<LE>().unwrap(), 0x0123_4567_89ab_cdef);
        assert_eq!(buffer.read_i64::<BE>().unwrap(), i64::MIN);
        assert_eq!(buffer.read_f64::<LE>().unwrap(), 6.25);
        assert_eq!(buffer.readable_bytes(), 0);
    }

    #[test]
    fn test_endianness_is_observable() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.allocate(4).unwrap();
        buffer.write_u32::<BE>(0x0102_0304).unwrap();
        let mut raw = [0u8; 4];
        buffer.get_bytes(0, &mut raw).unwrap();
        assert_eq!(raw, [1, 2, 3, 4]);
        assert_eq!(buffer.get_u32::<LE>(0).unwrap(), 0x0403_0201);
    }

    #[test]
    fn test_absolute_access_leaves_offsets_alone() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.allocate(8).unwrap();
        buffer.set_u32::<BE>(3, 42).unwrap();
        assert_eq!(buffer.reader_offset(), 0);
        assert_eq!(buffer.writer_offset(), 0);
        assert_eq!(buffer.get_u32::<BE>(3).unwrap(), 42);
    }

    #[test]
    fn test_relative_bounds() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.allocate(4).unwrap();
        assert!(buffer.read_u8().unwrap_err().is_out_of_bounds());
        buffer.write_u32::<BE>(1).unwrap();
        assert!(buffer.write_u8(0).unwrap_err().is_out_of_bounds());
        buffer.read_u32::<BE>().unwrap();
        assert!(buffer.read_u8().unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn test_absolute_bounds() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.allocate(8).unwrap();
        assert!(buffer.get_u32::<BE>(5).unwrap_err().is_out_of_bounds());
        assert!(buffer.get_u8(8).unwrap_err().is_out_of_bounds());
        assert!(buffer.set_u64::<BE>(1, 0).unwrap_err().is_out_of_bounds());
        assert!(buffer.set_u8(usize::MAX, 0).unwrap_err().is_out_of_bounds());
        buffer.set_u32::<BE>(4, 7).unwrap();
    }

    #[test]
    fn test_read_only_rejects_writes_but_not_reads() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.copy_of(b"abcd").unwrap();
        buffer.make_read_only().unwrap();
        assert!(buffer.write_u8(0).unwrap_err().is_read_only());
        assert!(buffer.set_bytes(0, b"x").unwrap_err().is_read_only());
        assert_eq!(buffer.get_u8(1).unwrap(), b'b');
        assert_eq!(buffer.read_u8().unwrap(), b'a');
    }

    #[test]
    fn test_closed_rejects_everything() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.copy_of(b"abcd").unwrap();
        buffer.close().unwrap();
        assert!(buffer.read_u8().unwrap_err().is_closed());
        assert!(buffer.write_u8(0).unwrap_err().is_closed());
        assert!(buffer.get_u8(0).unwrap_err().is_closed());
        assert!(buffer.set_u8(0, 0).unwrap_err().is_closed());
        let mut sink = [0u8; 1];
        assert!(buffer.get_bytes(0, &mut sink).unwrap_err().is_closed());
    }

    #[test]
    fn test_values_straddle_composite_boundaries() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc
            .compose([alloc.allocate(4).unwrap(), alloc.allocate(4).unwrap()])
            .unwrap();

        buffer.write_u64::<BE>(0x0102_0304_0506_0708).unwrap();
        assert_eq!(buffer.writer_offset(), 8);
        assert_eq!(buffer.get_u32::<BE>(2).unwrap(), 0x0304_0506);

        buffer.set_u32::<LE>(3, 0xa0b0_c0d0).unwrap();
        assert_eq!(buffer.get_u32::<LE>(3).unwrap(), 0xa0b0_c0d0);

        buffer.set_reader_offset(2).unwrap();
        assert_eq!(buffer.read_u32::<BE>().unwrap(), 0x03d0_c0b0);
        assert_eq!(buffer.reader_offset(), 6);
    }

    #[test]
    fn test_bulk_bytes_round_trip() {
        fastrand::seed(0x0b5e55ed);
        let payload: Vec<u8> = (0..192).map(|_| fastrand::u8(..)).collect();

        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc
            .compose([
                alloc.allocate(64).unwrap(),
                alloc.allocate(64).unwrap(),
                alloc.allocate(64).unwrap(),
            ])
            .unwrap();
        buffer.write_bytes(&payload).unwrap();

        let mut out = vec![0u8; 192];
        buffer.get_bytes(0, &mut out).unwrap();
        assert_eq!(out, payload);

        let mut tail = vec![0u8; 100];
        buffer.set_reader_offset(92).unwrap();
        buffer.read_bytes(&mut tail).unwrap();
        assert_eq!(tail, payload[92..]);
        assert_eq!(buffer.readable_bytes(), 0);

        buffer.set_bytes(10, &payload[..50]).unwrap();
        let mut patched = vec![0u8; 50];
        buffer.get_bytes(10, &mut patched).unwrap();
        assert_eq!(patched, payload[..50]);
    }

    #[test]
    fn test_empty_transfers_are_no_ops() {
        let alloc = BufferAllocator::on_heap_unpooled();
        let mut buffer = alloc.allocate(4).unwrap();
        buffer.write_bytes(&[]).unwrap();
        buffer.read_bytes(&mut []).unwrap();
        buffer.get_bytes(4, &mut []).unwrap();
        buffer.set_bytes(0, &[]).unwrap();
        assert_eq!(buffer.writer_offset(), 0);
        assert_eq!(buffer.reader_offset(), 0);
    }
}

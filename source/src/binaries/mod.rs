use std::io::{self, Read};

use crate::bsp::{BspError, BspResult};

/// Fixed layout data that can be read straight out of a byte stream.
pub trait BinaryData: bytemuck::Pod {
    fn read<R: Read>(buffer: &mut R) -> io::Result<Self> {
        let mut value = Self::zeroed();
        // `read_exact()` comes from `Read` impl for `&[u8]`
        buffer.read_exact(bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }
}

impl<T: bytemuck::Pod> BinaryData for T {}

/// Positional reader over a borrowed byte buffer.
///
/// Nothing is allocated except the values handed back; reading past the end of the
/// buffer fails with [`BspError::TruncatedFile`].
#[derive(Clone, Copy)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn with_pos(&self, pos: usize) -> Self {
        Self {
            bytes: self.bytes,
            pos,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, count: usize) -> BspResult<&'a [u8]> {
        let from = self.pos;
        let to = from
            .checked_add(count)
            .ok_or_else(|| self.out_of_bounds(from, usize::MAX))?;
        let bytes = self.bytes.get(from..to).ok_or_else(|| self.out_of_bounds(from, to))?;
        self.pos = to;
        Ok(bytes)
    }

    pub fn read<T: BinaryData>(&mut self) -> BspResult<T> {
        let mut bytes = self.read_bytes(std::mem::size_of::<T>())?;
        T::read(&mut bytes).map_err(BspError::from)
    }

    /// Read `count` consecutive records. Copies, so `T` need not be aligned within the buffer.
    pub fn read_array<T: BinaryData>(&mut self, count: usize) -> BspResult<Box<[T]>> {
        let size = std::mem::size_of::<T>()
            .checked_mul(count)
            .ok_or_else(|| self.out_of_bounds(self.pos, usize::MAX))?;
        let bytes = self.read_bytes(size)?;
        if count == 0 {
            return Ok(Box::new([]));
        }
        Ok(bytemuck::pod_collect_to_vec::<u8, T>(bytes).into_boxed_slice())
    }

    /// Null terminated string. A missing terminator ends the string at the end of the buffer.
    pub fn read_cstring(&mut self) -> BspResult<String> {
        let rest = self
            .bytes
            .get(self.pos..)
            .ok_or_else(|| self.out_of_bounds(self.pos, self.pos))?;
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += (len + 1).min(rest.len());
        Ok(s)
    }

    /// String prefixed by its length as a little endian `u32`.
    pub fn read_prefixed_string(&mut self) -> BspResult<String> {
        let len: u32 = self.read()?;
        let bytes = self.read_bytes(len as usize)?;
        let bytes = match bytes.iter().position(|&b| b == 0) {
            Some(end) => &bytes[..end],
            None => bytes,
        };
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn out_of_bounds(&self, from: usize, to: usize) -> BspError {
        BspError::TruncatedFile {
            lump: None,
            from,
            to,
            size: self.bytes.len(),
        }
    }
}

use depot_types::{NameRef, PackageIndex};

use crate::error::{StreamError, StreamResult};

/// Longest string the format permits. Anything larger is a corrupt length
/// prefix, not a real name.
pub const MAX_STRING_LEN: u32 = 64 * 1024;

/// Seekable reader over a byte slice. All integers little-endian.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns `true` when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Jump to an absolute offset. Seeking to the end is allowed.
    pub fn seek(&mut self, target: usize) -> StreamResult<()> {
        if target > self.data.len() {
            return Err(StreamError::SeekOutOfRange {
                target,
                len: self.data.len(),
            });
        }
        self.pos = target;
        Ok(())
    }

    /// Advance by exactly `count` bytes without interpreting them.
    pub fn skip(&mut self, count: usize) -> StreamResult<()> {
        self.take(count).map(|_| ())
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> StreamResult<&'a [u8]> {
        self.take(count)
    }

    pub fn read_u8(&mut self) -> StreamResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> StreamResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    pub fn read_u32(&mut self) -> StreamResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    pub fn read_u64(&mut self) -> StreamResult<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    pub fn read_i32(&mut self) -> StreamResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    pub fn read_f32(&mut self) -> StreamResult<f32> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    /// Four-byte boolean, strictly 0 or 1.
    pub fn read_bool32(&mut self) -> StreamResult<bool> {
        let offset = self.pos;
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(StreamError::InvalidBool { offset, value }),
        }
    }

    /// u32 length prefix followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> StreamResult<String> {
        let offset = self.pos;
        let len = self.read_u32()?;
        if len > MAX_STRING_LEN {
            return Err(StreamError::StringTooLong {
                offset,
                len,
                cap: MAX_STRING_LEN,
            });
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| StreamError::InvalidUtf8 { offset })
    }

    pub fn read_name_ref(&mut self) -> StreamResult<NameRef> {
        Ok(NameRef(self.read_u32()?))
    }

    pub fn read_package_index(&mut self) -> StreamResult<PackageIndex> {
        Ok(PackageIndex::from_raw(self.read_i32()?))
    }

    fn take(&mut self, count: usize) -> StreamResult<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(StreamError::UnexpectedEof {
                offset: self.pos,
                wanted: count,
                remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }
}

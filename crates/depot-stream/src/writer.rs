use depot_types::{NameRef, PackageIndex};

/// Growable little-endian byte writer, the mirror of [`crate::Cursor`].
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer, yielding the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Borrow what has been written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool32(&mut self, value: bool) {
        self.write_u32(value as u32);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// u32 length prefix followed by UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_name_ref(&mut self, name: NameRef) {
        self.write_u32(name.index());
    }

    pub fn write_package_index(&mut self, index: PackageIndex) {
        self.write_i32(index.to_raw());
    }

    /// Overwrite a u32 written earlier, for offset back-patching.
    ///
    /// Panics if `offset + 4` is out of range; callers patch positions they
    /// recorded from `len()`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use proptest::prelude::*;

    #[test]
    fn patch_u32_overwrites_in_place() {
        let mut w = Writer::new();
        let at = w.len();
        w.write_u32(0);
        w.write_u8(9);
        w.patch_u32(at, 1234);

        let mut c = Cursor::new(w.as_bytes());
        assert_eq!(c.read_u32().unwrap(), 1234);
        assert_eq!(c.read_u8().unwrap(), 9);
    }

    proptest! {
        #[test]
        fn strings_roundtrip(s in "\\PC{0,64}") {
            let mut w = Writer::new();
            w.write_string(&s);
            let data = w.into_bytes();
            prop_assert_eq!(Cursor::new(&data).read_string().unwrap(), s);
        }
    }
}

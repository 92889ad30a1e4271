//! The fixed-layout package summary.

use depot_stream::{Cursor, Writer};
use depot_types::PackageGuid;

use crate::error::{PackageError, PackageResult};

/// File magic, stored as raw bytes at offset 0.
pub const MAGIC: &[u8; 4] = b"DPAK";

/// Oldest format revision this loader still reads.
pub const MIN_SUPPORTED_VERSION: u16 = 4;

/// Revision written by [`crate::PackageBuilder`].
pub const CURRENT_VERSION: u16 = 7;

/// Serialized size of the summary in bytes.
pub const SUMMARY_SIZE: usize = 60;

/// Package flag: the payload region is one zstd frame.
pub const PKG_FLAG_COMPRESSED: u32 = 1 << 0;

/// Parsed summary: versioning, identity, and table geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageSummary {
    pub file_version: u16,
    pub licensee: u16,
    pub package_flags: u32,
    pub guid: PackageGuid,
    pub name_count: u32,
    pub name_offset: u32,
    pub import_count: u32,
    pub import_offset: u32,
    pub export_count: u32,
    pub export_offset: u32,
    pub payload_offset: u32,
    pub table_crc32: u32,
}

impl PackageSummary {
    /// Parse the summary from the start of a package file.
    ///
    /// Checks magic and version here; the table CRC is checked by the caller
    /// once the whole file is available.
    pub fn parse(data: &[u8]) -> PackageResult<Self> {
        let mut cursor = Cursor::new(data);
        let magic = cursor.read_bytes(4)?;
        if magic != MAGIC {
            return Err(PackageError::InvalidMagic {
                actual: String::from_utf8_lossy(magic).into_owned(),
            });
        }

        let file_version = cursor.read_u16()?;
        if !(MIN_SUPPORTED_VERSION..=CURRENT_VERSION).contains(&file_version) {
            return Err(PackageError::UnsupportedVersion(file_version));
        }

        let licensee = cursor.read_u16()?;
        let package_flags = cursor.read_u32()?;
        let guid = PackageGuid::from_slice(cursor.read_bytes(16)?)?;
        let name_count = cursor.read_u32()?;
        let name_offset = cursor.read_u32()?;
        let import_count = cursor.read_u32()?;
        let import_offset = cursor.read_u32()?;
        let export_count = cursor.read_u32()?;
        let export_offset = cursor.read_u32()?;
        let payload_offset = cursor.read_u32()?;
        let table_crc32 = cursor.read_u32()?;

        Ok(Self {
            file_version,
            licensee,
            package_flags,
            guid,
            name_count,
            name_offset,
            import_count,
            import_offset,
            export_count,
            export_offset,
            payload_offset,
            table_crc32,
        })
    }

    /// Serialize the summary.
    pub fn write(&self, w: &mut Writer) {
        w.write_bytes(MAGIC);
        w.write_u16(self.file_version);
        w.write_u16(self.licensee);
        w.write_u32(self.package_flags);
        w.write_bytes(self.guid.as_bytes());
        w.write_u32(self.name_count);
        w.write_u32(self.name_offset);
        w.write_u32(self.import_count);
        w.write_u32(self.import_offset);
        w.write_u32(self.export_count);
        w.write_u32(self.export_offset);
        w.write_u32(self.payload_offset);
        w.write_u32(self.table_crc32);
    }

    /// Returns `true` when the payload region is zstd-compressed.
    pub fn is_compressed(&self) -> bool {
        self.package_flags & PKG_FLAG_COMPRESSED != 0
    }

    /// Validate the summary CRC against the file's table region.
    pub fn check_table_crc(&self, file: &[u8]) -> PackageResult<()> {
        let start = self.name_offset as u64;
        let end = self.payload_offset as u64;
        let len = file.len() as u64;
        if start > end || end > len {
            return Err(PackageError::TableRegionOutOfRange { start, end, len });
        }
        let actual = crc32fast::hash(&file[start as usize..end as usize]);
        if actual != self.table_crc32 {
            return Err(PackageError::TableCrcMismatch {
                expected: self.table_crc32,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PackageSummary {
        PackageSummary {
            file_version: CURRENT_VERSION,
            licensee: 0,
            package_flags: 0,
            guid: PackageGuid::nil(),
            name_count: 1,
            name_offset: SUMMARY_SIZE as u32,
            import_count: 0,
            import_offset: SUMMARY_SIZE as u32 + 8,
            export_count: 0,
            export_offset: SUMMARY_SIZE as u32 + 8,
            payload_offset: SUMMARY_SIZE as u32 + 8,
            table_crc32: 0,
        }
    }

    #[test]
    fn summary_roundtrip() {
        let original = summary();
        let mut w = Writer::new();
        original.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), SUMMARY_SIZE);
        assert_eq!(PackageSummary::parse(&bytes).unwrap(), original);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut w = Writer::new();
        summary().write(&mut w);
        let mut bytes = w.into_bytes();
        bytes[0..4].copy_from_slice(b"JUNK");
        let err = PackageSummary::parse(&bytes).unwrap_err();
        assert!(matches!(err, PackageError::InvalidMagic { .. }));
    }

    #[test]
    fn version_gates() {
        for (version, ok) in [
            (MIN_SUPPORTED_VERSION - 1, false),
            (MIN_SUPPORTED_VERSION, true),
            (CURRENT_VERSION, true),
            (CURRENT_VERSION + 1, false),
        ] {
            let mut s = summary();
            s.file_version = version;
            let mut w = Writer::new();
            s.write(&mut w);
            let result = PackageSummary::parse(&w.into_bytes());
            assert_eq!(result.is_ok(), ok, "version {version}");
        }
    }

    #[test]
    fn truncated_summary_rejected() {
        let mut w = Writer::new();
        summary().write(&mut w);
        let bytes = w.into_bytes();
        let err = PackageSummary::parse(&bytes[..20]).unwrap_err();
        assert!(matches!(err, PackageError::Stream(_)));
    }

    #[test]
    fn table_crc_checked_over_region() {
        let mut s = summary();
        s.name_offset = 4;
        s.payload_offset = 8;
        let file = [0u8, 0, 0, 0, 1, 2, 3, 4];
        s.table_crc32 = crc32fast::hash(&[1, 2, 3, 4]);
        s.check_table_crc(&file).unwrap();

        s.table_crc32 ^= 1;
        assert!(matches!(
            s.check_table_crc(&file),
            Err(PackageError::TableCrcMismatch { .. })
        ));
    }

    #[test]
    fn table_region_bounds_checked() {
        let mut s = summary();
        s.name_offset = 100;
        s.payload_offset = 50;
        assert!(matches!(
            s.check_table_crc(&[0u8; 10]),
            Err(PackageError::TableRegionOutOfRange { .. })
        ));
    }
}

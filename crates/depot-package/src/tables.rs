//! Import and export table records.

use depot_stream::{Cursor, StreamResult, Writer};
use depot_types::{NameRef, ObjectFlags, PackageIndex};

/// A reference to an object owned by a different package.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    /// Package that defines the imported object's class.
    pub class_package: NameRef,
    pub class_name: NameRef,
    /// Containment link; `Null` for top-level imports, in which case
    /// `class_package` doubles as the source package name.
    pub outer: PackageIndex,
    pub object_name: NameRef,
    /// Package the object itself lives in.
    pub source_package: NameRef,
}

impl ImportEntry {
    pub const WIRE_SIZE: usize = 20;

    pub fn parse(cursor: &mut Cursor<'_>) -> StreamResult<Self> {
        Ok(Self {
            class_package: cursor.read_name_ref()?,
            class_name: cursor.read_name_ref()?,
            outer: cursor.read_package_index()?,
            object_name: cursor.read_name_ref()?,
            source_package: cursor.read_name_ref()?,
        })
    }

    pub fn write(&self, w: &mut Writer) {
        w.write_name_ref(self.class_package);
        w.write_name_ref(self.class_name);
        w.write_package_index(self.outer);
        w.write_name_ref(self.object_name);
        w.write_name_ref(self.source_package);
    }
}

/// An object defined and owned by this package.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportEntry {
    /// Class reference: `Null` marks the export as a class definition,
    /// `Export` points at a class defined locally, `Import` at one defined
    /// in another package.
    pub class_index: PackageIndex,
    pub outer: PackageIndex,
    pub object_name: NameRef,
    pub object_flags: ObjectFlags,
    /// Byte size of the serialized object payload.
    pub serial_size: u32,
    /// Offset of the payload, relative to the start of the (decompressed)
    /// payload region.
    pub serial_offset: u32,
}

impl ExportEntry {
    pub const WIRE_SIZE: usize = 24;

    pub fn parse(cursor: &mut Cursor<'_>) -> StreamResult<Self> {
        Ok(Self {
            class_index: cursor.read_package_index()?,
            outer: cursor.read_package_index()?,
            object_name: cursor.read_name_ref()?,
            object_flags: ObjectFlags(cursor.read_u32()?),
            serial_size: cursor.read_u32()?,
            serial_offset: cursor.read_u32()?,
        })
    }

    pub fn write(&self, w: &mut Writer) {
        w.write_package_index(self.class_index);
        w.write_package_index(self.outer);
        w.write_name_ref(self.object_name);
        w.write_u32(self.object_flags.bits());
        w.write_u32(self.serial_size);
        w.write_u32(self.serial_offset);
    }
}

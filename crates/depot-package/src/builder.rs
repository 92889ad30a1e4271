//! Writer-side twin of the parser.
//!
//! `PackageBuilder` assembles a complete container (summary, name table,
//! import/export tables, payload region), computing serial offsets and the
//! table CRC on `finish`. The `depot pack` command and nearly every test in
//! the workspace fabricate packages through it.

use std::path::Path;

use depot_class::ClassSchema;
use depot_stream::Writer;
use depot_types::{NameTable, ObjectFlags, PackageGuid, PackageIndex};

use crate::error::PackageResult;
use crate::property::TagWriter;
use crate::summary::{PackageSummary, CURRENT_VERSION, PKG_FLAG_COMPRESSED, SUMMARY_SIZE};
use crate::tables::{ExportEntry, ImportEntry};

struct PendingExport {
    class_index: PackageIndex,
    outer: PackageIndex,
    object_name: String,
    object_flags: ObjectFlags,
    payload: Vec<u8>,
}

/// Builds a package file in memory.
pub struct PackageBuilder {
    version: u16,
    guid: PackageGuid,
    compressed: bool,
    names: NameTable,
    imports: Vec<ImportEntry>,
    exports: Vec<PendingExport>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            version: CURRENT_VERSION,
            guid: PackageGuid::nil(),
            compressed: false,
            names: NameTable::new(),
            imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Write an older (still supported) format revision.
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn with_guid(mut self, guid: PackageGuid) -> Self {
        self.guid = guid;
        self
    }

    /// Compress the payload region into one zstd frame.
    pub fn with_compression(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Add an import record; returns its `Import` reference.
    pub fn add_import(
        &mut self,
        class_package: &str,
        class_name: &str,
        object_name: &str,
        source_package: &str,
    ) -> PackageIndex {
        let entry = ImportEntry {
            class_package: self.names.intern(class_package),
            class_name: self.names.intern(class_name),
            outer: PackageIndex::Null,
            object_name: self.names.intern(object_name),
            source_package: self.names.intern(source_package),
        };
        self.imports.push(entry);
        PackageIndex::Import(self.imports.len() as u32 - 1)
    }

    /// Add an export with a raw payload; returns its `Export` reference.
    ///
    /// `class_index` follows the table convention: `Null` marks a class
    /// definition, otherwise a local export or an import reference.
    pub fn add_export(
        &mut self,
        class_index: PackageIndex,
        outer: PackageIndex,
        object_name: &str,
        object_flags: ObjectFlags,
        payload: Vec<u8>,
    ) -> PackageIndex {
        self.names.intern(object_name);
        self.exports.push(PendingExport {
            class_index,
            outer,
            object_name: object_name.to_string(),
            object_flags,
            payload,
        });
        PackageIndex::Export(self.exports.len() as u32 - 1)
    }

    /// Add a content export whose payload is a property-tag stream.
    pub fn add_object(
        &mut self,
        class_index: PackageIndex,
        outer: PackageIndex,
        object_name: &str,
        object_flags: ObjectFlags,
        build: impl FnOnce(TagWriter<'_>) -> TagWriter<'_>,
    ) -> PackageIndex {
        let payload = build(TagWriter::new(&mut self.names)).finish();
        self.add_export(class_index, outer, object_name, object_flags, payload)
    }

    /// Add a class-definition export (`Null` class reference).
    pub fn add_class(&mut self, schema: &ClassSchema) -> PackageIndex {
        let mut w = Writer::new();
        schema.write(&mut w);
        let name = schema.name.clone();
        self.add_export(
            PackageIndex::Null,
            PackageIndex::Null,
            &name,
            ObjectFlags::PUBLIC,
            w.into_bytes(),
        )
    }

    /// Add a redirector export pointing at `target`.
    pub fn add_redirector(
        &mut self,
        class_index: PackageIndex,
        object_name: &str,
        target: &str,
    ) -> PackageIndex {
        let mut w = Writer::new();
        w.write_string(target);
        self.add_export(
            class_index,
            PackageIndex::Null,
            object_name,
            ObjectFlags::PUBLIC,
            w.into_bytes(),
        )
    }

    /// Intern a name without attaching it to a record.
    pub fn intern(&mut self, name: &str) -> depot_types::NameRef {
        self.names.intern(name)
    }

    /// Serialize the package.
    pub fn finish_to_bytes(self) -> PackageResult<Vec<u8>> {
        // Payload region first: it fixes each export's serial offset.
        let mut payload = Writer::new();
        let mut export_entries = Vec::with_capacity(self.exports.len());
        for pending in &self.exports {
            let serial_offset = payload.len() as u32;
            payload.write_bytes(&pending.payload);
            export_entries.push(ExportEntry {
                class_index: pending.class_index,
                outer: pending.outer,
                object_name: self
                    .names
                    .find(&pending.object_name)
                    .expect("interned in add_export"),
                object_flags: pending.object_flags,
                serial_size: pending.payload.len() as u32,
                serial_offset,
            });
        }

        let mut tables = Writer::new();
        for name in self.names.iter() {
            tables.write_string(name);
        }
        let name_end = tables.len();
        for import in &self.imports {
            import.write(&mut tables);
        }
        let import_end = tables.len();
        for export in &export_entries {
            export.write(&mut tables);
        }
        let tables = tables.into_bytes();
        let table_crc32 = crc32fast::hash(&tables);

        let payload_bytes = if self.compressed {
            zstd::encode_all(payload.as_bytes(), 3)
                .map_err(|e| crate::error::PackageError::Compression(e.to_string()))?
        } else {
            payload.into_bytes()
        };

        let name_offset = SUMMARY_SIZE as u32;
        let summary = PackageSummary {
            file_version: self.version,
            licensee: 0,
            package_flags: if self.compressed {
                PKG_FLAG_COMPRESSED
            } else {
                0
            },
            guid: self.guid,
            name_count: self.names.len() as u32,
            name_offset,
            import_count: self.imports.len() as u32,
            import_offset: name_offset + name_end as u32,
            export_count: export_entries.len() as u32,
            export_offset: name_offset + import_end as u32,
            payload_offset: name_offset + tables.len() as u32,
            table_crc32,
        };

        let mut out = Writer::new();
        summary.write(&mut out);
        out.write_bytes(&tables);
        out.write_bytes(&payload_bytes);
        Ok(out.into_bytes())
    }

    /// Serialize and write to disk.
    pub fn finish(self, path: &Path) -> PackageResult<()> {
        let bytes = self.finish_to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! A single loaded container.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use depot_class::{ClassKind, ClassRegistry, ClassSchema};
use depot_stream::Cursor;
use depot_types::{NameTable, ObjectPath, PackageIndex};
use memmap2::Mmap;
use tracing::{debug, info, warn};

use crate::error::{PackageError, PackageResult};
use crate::object::{LoadedObject, ObjectError, ObjectPayload, ObjectResult};
use crate::property::decode_properties;
use crate::summary::PackageSummary;
use crate::tables::{ExportEntry, ImportEntry};

/// Materialization state of a package.
///
/// `Cancelled` is a valid, inspectable terminal state: objects built before
/// the cancellation stay in the cache, the package is neither ready nor
/// failed, and nothing is corrupted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageState {
    /// Tables parsed; no bulk materialization attempted yet.
    Header,
    /// A `load_all` pass is running.
    Loading,
    /// Every export has been visited.
    Ready,
    /// A `load_all` pass was cancelled between objects.
    Cancelled,
}

/// Outcome of a `load_all` pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Cancelled,
}

/// An export whose construction failed; the rest of the package loaded on.
#[derive(Clone, Debug)]
pub struct ObjectFailure {
    pub export_index: u32,
    pub name: String,
    pub reason: String,
}

/// One loaded container: parsed tables plus the lazily-built object cache.
#[derive(Debug)]
pub struct Package {
    path: PathBuf,
    pkg_name: String,
    summary: PackageSummary,
    names: NameTable,
    imports: Vec<ImportEntry>,
    exports: Vec<ExportEntry>,
    payload: Vec<u8>,
    state: Mutex<PackageState>,
    objects: Mutex<HashMap<u32, Arc<LoadedObject>>>,
    object_failures: Mutex<Vec<ObjectFailure>>,
}

impl Package {
    /// Open a package file: map it, parse summary and tables, check the
    /// table CRC, and decompress the payload region.
    ///
    /// Any error here is fatal to this package and only this package.
    pub fn open(path: &Path) -> PackageResult<Self> {
        let file = File::open(path)?;
        // Read-only map of an immutable asset file.
        let mmap = unsafe { Mmap::map(&file)? };
        let pkg_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(path.to_path_buf(), pkg_name, &mmap)
    }

    /// Parse a package from bytes already in memory: a composite-container
    /// slice, or a fixture.
    pub fn from_bytes(path: PathBuf, pkg_name: String, data: &[u8]) -> PackageResult<Self> {
        let summary = PackageSummary::parse(data)?;
        summary.check_table_crc(data)?;

        let mut cursor = Cursor::new(data);

        cursor.seek(summary.name_offset as usize)?;
        let mut entries = Vec::with_capacity(summary.name_count as usize);
        for _ in 0..summary.name_count {
            entries.push(cursor.read_string()?);
        }
        let names = NameTable::from_entries(entries);

        cursor.seek(summary.import_offset as usize)?;
        let mut imports = Vec::with_capacity(summary.import_count as usize);
        for _ in 0..summary.import_count {
            imports.push(ImportEntry::parse(&mut cursor)?);
        }

        cursor.seek(summary.export_offset as usize)?;
        let mut exports = Vec::with_capacity(summary.export_count as usize);
        for _ in 0..summary.export_count {
            exports.push(ExportEntry::parse(&mut cursor)?);
        }

        let raw_payload = &data[summary.payload_offset as usize..];
        let payload = if summary.is_compressed() {
            zstd::decode_all(raw_payload)
                .map_err(|e| PackageError::Decompression(e.to_string()))?
        } else {
            raw_payload.to_vec()
        };

        let package = Self {
            path,
            pkg_name,
            summary,
            names,
            imports,
            exports,
            payload,
            state: Mutex::new(PackageState::Header),
            objects: Mutex::new(HashMap::new()),
            object_failures: Mutex::new(Vec::new()),
        };
        package.validate_tables()?;

        debug!(
            package = %package.pkg_name,
            names = package.names.len(),
            imports = package.imports.len(),
            exports = package.exports.len(),
            "parsed package tables"
        );
        Ok(package)
    }

    fn validate_tables(&self) -> PackageResult<()> {
        let export_len = self.exports.len() as u32;
        let import_len = self.imports.len() as u32;
        let check = |export: u32, what: &'static str, index: PackageIndex| match index {
            PackageIndex::Null => Ok(()),
            PackageIndex::Export(i) if i < export_len => Ok(()),
            PackageIndex::Import(i) if i < import_len => Ok(()),
            other => Err(PackageError::BadTableRef {
                export,
                what,
                index: other.to_raw(),
            }),
        };

        for (i, export) in self.exports.iter().enumerate() {
            check(i as u32, "class", export.class_index)?;
            check(i as u32, "outer", export.outer)?;
        }

        // Outer links must form a tree; a chain longer than the table is a
        // cycle.
        for (i, _) in self.exports.iter().enumerate() {
            let mut steps = 0usize;
            let mut current = self.exports[i].outer;
            while let PackageIndex::Export(next) = current {
                steps += 1;
                if steps > self.exports.len() {
                    return Err(PackageError::OuterCycle { export: i as u32 });
                }
                current = self.exports[next as usize].outer;
            }
        }
        Ok(())
    }

    /// The file this package was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The package's logical name (file stem, or the composite slot name).
    pub fn name(&self) -> &str {
        &self.pkg_name
    }

    pub fn summary(&self) -> &PackageSummary {
        &self.summary
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn imports(&self) -> &[ImportEntry] {
        &self.imports
    }

    pub fn exports(&self) -> &[ExportEntry] {
        &self.exports
    }

    pub fn state(&self) -> PackageState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        self.state() == PackageState::Ready
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == PackageState::Cancelled
    }

    /// Exports that failed to construct during `load_all`.
    pub fn object_failures(&self) -> Vec<ObjectFailure> {
        self.object_failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Resolve an export's class name through the local tables.
    ///
    /// A `Null` class reference marks the export as a class definition.
    pub fn export_class_name(&self, index: u32) -> ObjectResult<String> {
        let entry = &self.exports[index as usize];
        let name_ref = match entry.class_index {
            PackageIndex::Null => return Ok("Class".to_string()),
            PackageIndex::Export(i) => self.exports[i as usize].object_name,
            // The referenced import *is* the class; its object name names it.
            PackageIndex::Import(i) => self.imports[i as usize].object_name,
        };
        Ok(self.names.get(name_ref).map_err(ObjectError::Names)?.to_string())
    }

    /// Find a local export by object name, optionally filtered by class.
    pub fn find_export(&self, object_name: &str, class_name: Option<&str>) -> Option<u32> {
        (0..self.exports.len() as u32).find(|&i| {
            let entry = &self.exports[i as usize];
            let name_matches = self
                .names
                .get(entry.object_name)
                .map(|n| n.eq_ignore_ascii_case(object_name))
                .unwrap_or(false);
            name_matches
                && class_name.map_or(true, |want| {
                    self.export_class_name(i)
                        .map(|have| have.eq_ignore_ascii_case(want))
                        .unwrap_or(false)
                })
        })
    }

    /// Dotted path of an export: package, outers in containment order, then
    /// the object.
    pub fn export_path(&self, index: u32) -> PackageResult<ObjectPath> {
        let mut segments = vec![self
            .names
            .get(self.exports[index as usize].object_name)?
            .to_string()];
        let mut current = self.exports[index as usize].outer;
        while let PackageIndex::Export(i) = current {
            segments.push(self.names.get(self.exports[i as usize].object_name)?.to_string());
            current = self.exports[i as usize].outer;
        }
        segments.push(self.pkg_name.clone());
        segments.reverse();
        Ok(ObjectPath::from_segments(segments)?)
    }

    /// Materialize the export at `index`, or return the cached instance.
    ///
    /// Identity invariant: every call for the same index yields the same
    /// `Arc`. Construction happens under the cache lock; decoding never
    /// re-enters the cache, so the coarse lock cannot deadlock.
    pub fn object_at(
        &self,
        index: u32,
        registry: &ClassRegistry,
    ) -> ObjectResult<Arc<LoadedObject>> {
        if index as usize >= self.exports.len() {
            return Err(ObjectError::NoSuchExport {
                index,
                count: self.exports.len(),
            });
        }
        let mut cache = self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = cache.get(&index) {
            return Ok(existing.clone());
        }
        let object = Arc::new(self.materialize(index, registry)?);
        cache.insert(index, object.clone());
        Ok(object)
    }

    /// The cached instance, if the export was already materialized.
    pub fn cached_object(&self, index: u32) -> Option<Arc<LoadedObject>> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&index)
            .cloned()
    }

    /// Number of materialized exports.
    pub fn loaded_object_count(&self) -> usize {
        self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    fn materialize(&self, index: u32, registry: &ClassRegistry) -> ObjectResult<LoadedObject> {
        let entry = &self.exports[index as usize];
        let name = self
            .names
            .get(entry.object_name)
            .map_err(ObjectError::Names)?
            .to_string();
        let class_name = self.export_class_name(index)?;
        let seed = registry.construct(&class_name)?;

        let start = entry.serial_offset as usize;
        let end = start + entry.serial_size as usize;
        if end > self.payload.len() {
            return Err(ObjectError::SerialRangeOutOfRange {
                offset: entry.serial_offset,
                size: entry.serial_size,
                payload: self.payload.len(),
            });
        }
        let mut cursor = Cursor::new(&self.payload[start..end]);

        let payload = match seed.kind {
            ClassKind::Class => {
                let schema = ClassSchema::parse(&name, &mut cursor)?;
                ObjectPayload::ClassDef(schema)
            }
            ClassKind::Redirector => {
                let target = cursor.read_string()?;
                ObjectPayload::Redirector {
                    target: ObjectPath::parse(&target)?,
                }
            }
            ClassKind::Object | ClassKind::Package => {
                let decoded = decode_properties(&mut cursor, &self.names, Some(&seed))?;
                ObjectPayload::Fields(decoded)
            }
        };

        debug!(package = %self.pkg_name, object = %name, class = %class_name, "materialized export");
        Ok(LoadedObject {
            export_index: index,
            name,
            class_name,
            outer: entry.outer,
            flags: entry.object_flags,
            payload,
        })
    }

    /// Materialize every export, checking `cancel` at object boundaries.
    ///
    /// Idempotent: a package already `Ready` returns immediately. Failures
    /// of individual objects are recorded and skipped; they never abort the
    /// pass. `progress` receives (visited, total).
    pub fn load_all(
        &self,
        registry: &ClassRegistry,
        cancel: impl Fn() -> bool,
        progress: impl Fn(u32, u32),
    ) -> LoadOutcome {
        {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if *state == PackageState::Ready {
                return LoadOutcome::Ready;
            }
            *state = PackageState::Loading;
        }

        let total = self.exports.len() as u32;
        for index in 0..total {
            if cancel() {
                *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = PackageState::Cancelled;
                info!(package = %self.pkg_name, at = index, "load cancelled");
                return LoadOutcome::Cancelled;
            }
            if let Err(e) = self.object_at(index, registry) {
                let name = self
                    .names
                    .get(self.exports[index as usize].object_name)
                    .unwrap_or("<bad name>")
                    .to_string();
                warn!(package = %self.pkg_name, object = %name, error = %e, "export failed to load");
                self.object_failures
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(ObjectFailure {
                        export_index: index,
                        name,
                        reason: e.to_string(),
                    });
            }
            progress(index + 1, total);
        }

        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = PackageState::Ready;
        info!(package = %self.pkg_name, exports = total, "package ready");
        LoadOutcome::Ready
    }
}

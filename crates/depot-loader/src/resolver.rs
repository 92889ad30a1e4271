//! Cross-package reference resolution.
//!
//! A `PackageIndex` found in a property names either a local export, a
//! cross-package import, or nothing. Resolution materializes local exports
//! through the owning package's identity cache, and follows imports through
//! the registry, consulting the mapper tables when a plain lookup fails,
//! transitively and with cycle detection. A reference that cannot be
//! resolved fails alone: the property stays unresolved, the failure is
//! recorded, and the containing object survives.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use depot_class::ClassRegistry;
use depot_package::{LoadedObject, ObjectPayload, Package, PropertyValue};
use depot_types::{ObjectPath, PackageIndex};
use tracing::{debug, warn};

use crate::error::{LoaderError, LoaderResult};
use crate::registry::PackageRegistry;

/// Import and redirect chains longer than this are treated as corrupt.
pub const MAX_IMPORT_DEPTH: usize = 32;

/// One recorded resolution failure, kept for diagnostics.
#[derive(Clone, Debug)]
pub struct ResolveFailure {
    pub package: String,
    pub reference: String,
    pub reason: String,
}

/// Resolves `PackageIndex` values against a registry and class table.
pub struct ReferenceResolver<'a> {
    registry: &'a PackageRegistry,
    classes: &'a ClassRegistry,
    failures: Mutex<Vec<ResolveFailure>>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(registry: &'a PackageRegistry, classes: &'a ClassRegistry) -> Self {
        Self {
            registry,
            classes,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Resolution failures recorded so far.
    pub fn failures(&self) -> Vec<ResolveFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve a reference relative to `package`.
    ///
    /// `Null` resolves to `Ok(None)`. Exports materialize locally (and
    /// resolve their own object references, depth-first). Imports follow
    /// the import chain into other packages, loading them on demand.
    pub fn resolve(
        &self,
        package: &Arc<Package>,
        index: PackageIndex,
    ) -> LoaderResult<Option<Arc<LoadedObject>>> {
        let mut visited = HashSet::new();
        self.resolve_inner(package, index, &mut visited, 0)
    }

    fn resolve_inner(
        &self,
        package: &Arc<Package>,
        index: PackageIndex,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> LoaderResult<Option<Arc<LoadedObject>>> {
        match index {
            PackageIndex::Null => Ok(None),
            PackageIndex::Export(i) => self.resolve_export(package, i).map(Some),
            PackageIndex::Import(i) => {
                self.resolve_import(package, i, visited, depth).map(Some)
            }
        }
    }

    /// Materialize a local export and resolve its object properties.
    ///
    /// The export enters the identity cache *before* its properties are
    /// walked, so mutually-referencing objects terminate via the cache
    /// instead of recursing forever.
    fn resolve_export(
        &self,
        package: &Arc<Package>,
        index: u32,
    ) -> LoaderResult<Arc<LoadedObject>> {
        let already_cached = package.cached_object(index).is_some();
        let object = package.object_at(index, self.classes)?;
        if already_cached {
            return Ok(object);
        }

        if let ObjectPayload::Fields(decoded) = &object.payload {
            for property in &decoded.properties {
                self.resolve_property_refs(package, &object.name, &property.value);
            }
        }
        Ok(object)
    }

    fn resolve_property_refs(
        &self,
        package: &Arc<Package>,
        object_name: &str,
        value: &PropertyValue,
    ) {
        match value {
            PropertyValue::Object(index) => {
                if let Err(e) = self.resolve(package, *index) {
                    warn!(
                        package = %package.name(),
                        object = %object_name,
                        reference = %index,
                        error = %e,
                        "property reference left unresolved"
                    );
                    self.failures
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(ResolveFailure {
                            package: package.name().to_string(),
                            reference: format!("{object_name}:{index}"),
                            reason: e.to_string(),
                        });
                }
            }
            PropertyValue::Struct { fields, .. } => {
                for field in fields {
                    self.resolve_property_refs(package, object_name, &field.value);
                }
            }
            PropertyValue::Array(elements) => {
                for element in elements {
                    self.resolve_property_refs(package, object_name, element);
                }
            }
            _ => {}
        }
    }

    /// Follow an import record into its source package.
    fn resolve_import(
        &self,
        package: &Arc<Package>,
        index: u32,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> LoaderResult<Arc<LoadedObject>> {
        let imports = package.imports();
        if index as usize >= imports.len() {
            return Err(LoaderError::NoSuchImport {
                package: package.name().to_string(),
                index,
                count: imports.len(),
            });
        }
        let import = imports[index as usize];
        let names = package.names();
        let object_name = names.get(import.object_name)?.to_string();
        let class_name = names.get(import.class_name)?.to_string();
        let source_package = names.get(import.source_package)?.to_string();

        let key = format!(
            "{}.{}",
            source_package.to_ascii_lowercase(),
            object_name.to_ascii_lowercase()
        );
        if !visited.insert(key.clone()) {
            return Err(LoaderError::ImportCycle {
                start: format!("{}:{}", package.name(), PackageIndex::Import(index)),
                repeated: key,
            });
        }
        if depth >= MAX_IMPORT_DEPTH {
            return Err(LoaderError::ImportTooDeep {
                start: key,
                max: MAX_IMPORT_DEPTH,
            });
        }

        debug!(
            from = %package.name(),
            object = %object_name,
            class = %class_name,
            source = %source_package,
            "resolving import"
        );

        match self.registry.get_by_name(&source_package) {
            Ok(entry) => {
                let target = entry.get_or_open()?;
                if let Some(found) = target.find_export(&object_name, Some(&class_name)) {
                    return self.follow_export(&target, found, visited, depth);
                }
                // Export by name regardless of class: the class itself may
                // live behind another import hop.
                if let Some(found) = target.find_export(&object_name, None) {
                    return self.follow_export(&target, found, visited, depth);
                }
                self.redirect_or_fail(&source_package, &object_name, visited, depth)
            }
            Err(LoaderError::PackageNotFound(_)) => {
                self.redirect_or_fail(&source_package, &object_name, visited, depth)
            }
            Err(e) => Err(e),
        }
    }

    /// Materialize an export found during import resolution, chasing
    /// redirector stand-ins to the real object.
    fn follow_export(
        &self,
        package: &Arc<Package>,
        index: u32,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> LoaderResult<Arc<LoadedObject>> {
        let object = self.resolve_export(package, index)?;
        if let ObjectPayload::Redirector { target } = &object.payload {
            debug!(from = %object.name, to = %target, "following redirector object");
            return self.resolve_path(target, visited, depth + 1);
        }
        Ok(object)
    }

    /// Consult the redirector mapper for a moved object, or report failure.
    fn redirect_or_fail(
        &self,
        source_package: &str,
        object_name: &str,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> LoaderResult<Arc<LoadedObject>> {
        let path = ObjectPath::from_segments(vec![
            source_package.to_string(),
            object_name.to_string(),
        ])?;
        if let Some(mappers) = self.registry.mappers() {
            if let Some(target) = mappers.redirector.resolve_final(&path)? {
                debug!(from = %path, to = %target, "following mapper redirect");
                return self.resolve_path(&target, visited, depth + 1);
            }
        }
        Err(LoaderError::MissingExport {
            package: source_package.to_string(),
            object: object_name.to_string(),
        })
    }

    /// Resolve a dotted object path: package by name, then export by name.
    fn resolve_path(
        &self,
        path: &ObjectPath,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> LoaderResult<Arc<LoadedObject>> {
        let key = path.key().to_string();
        if !visited.insert(key.clone()) {
            return Err(LoaderError::ImportCycle {
                start: key.clone(),
                repeated: key,
            });
        }
        if depth >= MAX_IMPORT_DEPTH {
            return Err(LoaderError::ImportTooDeep {
                start: key,
                max: MAX_IMPORT_DEPTH,
            });
        }

        let entry = self.registry.get_by_name(path.package())?;
        let package = entry.get_or_open()?;
        let index = package
            .find_export(path.object(), None)
            .ok_or_else(|| LoaderError::MissingExport {
                package: path.package().to_string(),
                object: path.object().to_string(),
            })?;
        self.follow_export(&package, index, visited, depth)
    }
}

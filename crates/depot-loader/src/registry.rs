//! The process-wide package cache.
//!
//! Every package is looked up through here, keyed by normalized path. An
//! entry is registered *before* any parsing begins, so concurrent callers
//! racing on the same path always share one entry, and the entry's guard
//! guarantees exactly one parse ever runs. A failed package stays failed;
//! nothing retries automatically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};

use depot_class::ClassRegistry;
use depot_mapper::MapperSet;
use depot_package::{LoadOutcome, Package};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{LoaderError, LoaderResult};
use crate::progress::{ProgressEvent, ProgressFn};

/// Where an entry's bytes come from.
#[derive(Clone, Debug)]
enum PackageSource {
    /// A standalone `.dpk` file.
    File(PathBuf),
    /// A byte range inside a merged container.
    CompositeSlice {
        logical: String,
        container: PathBuf,
        offset: u64,
        size: u64,
    },
}

/// Open state of a registry entry.
enum Phase {
    Idle,
    Opening,
    Opened(Arc<Package>),
    Failed(String),
}

/// One registry slot: the open guard plus the bulk-load gate.
pub struct PackageEntry {
    key: String,
    source: PackageSource,
    phase: Mutex<Phase>,
    phase_changed: Condvar,
    load_running: Mutex<bool>,
    load_finished: Condvar,
}

impl std::fmt::Debug for PackageEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageEntry")
            .field("key", &self.key)
            .finish()
    }
}

impl PackageEntry {
    fn new(key: String, source: PackageSource) -> Self {
        Self {
            key,
            source,
            phase: Mutex::new(Phase::Idle),
            phase_changed: Condvar::new(),
            load_running: Mutex::new(false),
            load_finished: Condvar::new(),
        }
    }

    /// The normalized cache key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The opened package, if header and tables have been parsed.
    pub fn package(&self) -> Option<Arc<Package>> {
        match &*self.phase.lock().unwrap_or_else(PoisonError::into_inner) {
            Phase::Opened(package) => Some(package.clone()),
            _ => None,
        }
    }

    /// Returns `true` if this entry is in the sticky failed state.
    pub fn is_failed(&self) -> bool {
        matches!(
            &*self.phase.lock().unwrap_or_else(PoisonError::into_inner),
            Phase::Failed(_)
        )
    }

    /// Parse the package, or wait for whichever thread is already parsing.
    ///
    /// Exactly one parse runs per entry; everyone else observes its result,
    /// success or failure.
    pub fn get_or_open(&self) -> LoaderResult<Arc<Package>> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*phase {
                Phase::Opened(package) => return Ok(package.clone()),
                Phase::Failed(reason) => {
                    return Err(LoaderError::PackageFailed {
                        path: self.key.clone(),
                        reason: reason.clone(),
                    })
                }
                Phase::Opening => {
                    phase = self
                        .phase_changed
                        .wait(phase)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Phase::Idle => break,
            }
        }
        *phase = Phase::Opening;
        drop(phase);

        let result = self.open_source();

        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = match result {
            Ok(package) => {
                let package = Arc::new(package);
                *phase = Phase::Opened(package.clone());
                Ok(package)
            }
            Err(e) => {
                warn!(package = %self.key, error = %e, "package failed to open");
                *phase = Phase::Failed(e.to_string());
                Err(e)
            }
        };
        self.phase_changed.notify_all();
        outcome
    }

    fn open_source(&self) -> LoaderResult<Package> {
        match &self.source {
            PackageSource::File(path) => Ok(Package::open(path)?),
            PackageSource::CompositeSlice {
                logical,
                container,
                offset,
                size,
            } => {
                let bytes = std::fs::read(container)?;
                let end = offset
                    .checked_add(*size)
                    .filter(|&end| end <= bytes.len() as u64)
                    .ok_or_else(|| LoaderError::CompositeSliceOutOfRange {
                        logical: logical.clone(),
                        container: container.display().to_string(),
                        offset: *offset,
                        size: *size,
                        len: bytes.len() as u64,
                    })?;
                let slice = &bytes[*offset as usize..end as usize];
                Ok(Package::from_bytes(
                    container.clone(),
                    logical.clone(),
                    slice,
                )?)
            }
        }
    }

    /// Open if needed, then materialize every export.
    ///
    /// Mutually exclusive per entry: a second concurrent caller waits for
    /// the in-flight pass and observes its result instead of re-running it.
    pub fn load(
        &self,
        classes: &ClassRegistry,
        cancel: &CancelToken,
        progress: &ProgressFn<'_>,
    ) -> LoaderResult<LoadOutcome> {
        let package = self.get_or_open()?;

        {
            let mut running = self
                .load_running
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            while *running {
                running = self
                    .load_finished
                    .wait(running)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if package.is_ready() {
                return Ok(LoadOutcome::Ready);
            }
            *running = true;
        }

        let name = package.name().to_string();
        let outcome = package.load_all(
            classes,
            || cancel.is_cancelled(),
            |done, total| {
                let percent = if total == 0 {
                    100
                } else {
                    ((done as u64 * 100) / total as u64) as u8
                };
                progress(ProgressEvent::at(format!("Loading {name}..."), percent));
            },
        );

        let mut running = self
            .load_running
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *running = false;
        self.load_finished.notify_all();
        Ok(outcome)
    }
}

/// Registry of every known package entry, plus the one-time mapper tables.
#[derive(Debug)]
pub struct PackageRegistry {
    root: PathBuf,
    entries: Mutex<HashMap<String, Arc<PackageEntry>>>,
    mappers: OnceLock<MapperSet>,
}

impl PackageRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            entries: Mutex::new(HashMap::new()),
            mappers: OnceLock::new(),
        }
    }

    /// The content root this registry resolves bare names against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install the mapper tables after the parallel build phase. One-time.
    pub fn install_mappers(&self, mappers: MapperSet) {
        if self.mappers.set(mappers).is_err() {
            warn!("mapper tables already installed; ignoring rebuild");
        }
    }

    /// The mapper tables, once installed.
    pub fn mappers(&self) -> Option<&MapperSet> {
        self.mappers.get()
    }

    /// Get or create the entry for a package file path.
    ///
    /// The entry is registered under its normalized key before any parsing
    /// begins; concurrent callers for the same path share one entry.
    pub fn get_package(&self, path: &Path) -> Arc<PackageEntry> {
        let key = normalize_key(&path.to_string_lossy());
        self.entry_for(key, || PackageSource::File(path.to_path_buf()))
    }

    /// Resolve a bare package name to an entry.
    ///
    /// Order: a `.dpk` directly under the content root, then the package
    /// mapper (relocated files), then the composite mapper (merged
    /// containers).
    pub fn get_by_name(&self, name: &str) -> LoaderResult<Arc<PackageEntry>> {
        let direct = self.root.join(format!("{name}.dpk"));
        if direct.is_file() {
            return Ok(self.get_package(&direct));
        }

        if let Some(mappers) = self.mappers.get() {
            if let Some(path) = mappers.package.locate(name) {
                return Ok(self.get_package(path));
            }
            if let Some(slot) = mappers.composite.locate(name) {
                let key = format!(
                    "{}#{}",
                    normalize_key(&slot.container.to_string_lossy()),
                    name.to_ascii_lowercase()
                );
                let source = PackageSource::CompositeSlice {
                    logical: name.to_string(),
                    container: slot.container.clone(),
                    offset: slot.offset,
                    size: slot.size,
                };
                debug!(package = %name, container = %slot.container.display(), "resolving via composite mapper");
                return Ok(self.entry_for(key, || source));
            }
        }

        Err(LoaderError::PackageNotFound(name.to_string()))
    }

    /// Entries currently registered.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_for(
        &self,
        key: String,
        make_source: impl FnOnce() -> PackageSource,
    ) -> Arc<PackageEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&key) {
            return existing.clone();
        }
        info!(package = %key, "registered package entry");
        let entry = Arc::new(PackageEntry::new(key.clone(), make_source()));
        entries.insert(key, entry.clone());
        entry
    }
}

/// Case- and separator-normalized cache key.
fn normalize_key(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}

//! Startup orchestration and the loaded-core context.
//!
//! The pipeline mirrors the application startup it serves: enumerate the
//! content root, load the ordered class packages, load persistent data,
//! then build the three mapper tables on parallel threads joined by a
//! barrier. Cancellation is polled between every stage. Any stage failure
//! is fatal to startup and surfaces to the caller, which decides whether to
//! abort or continue degraded.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::thread;

use depot_class::ClassRegistry;
use depot_mapper::{
    CompositeMapper, MapperSet, PackageMapper, PersistentData, RedirectorMapper,
};
use depot_package::{ObjectPayload, Package};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{LoaderError, LoaderResult};
use crate::progress::{ProgressEvent, ProgressFn};
use crate::registry::PackageRegistry;
use crate::resolver::ReferenceResolver;

/// Schema packages loaded, in order, before any content package opens.
pub const DEFAULT_CLASS_PACKAGES: &[&str] = &["Core", "Engine", "GameFramework", "Editor"];

/// Startup configuration, passed explicitly; no ambient globals.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    pub content_root: PathBuf,
    pub class_packages: Vec<String>,
}

impl LoaderConfig {
    pub fn new(content_root: PathBuf) -> Self {
        Self {
            content_root,
            class_packages: DEFAULT_CLASS_PACKAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_class_packages(mut self, packages: Vec<String>) -> Self {
        self.class_packages = packages;
        self
    }
}

/// Result of the startup pipeline. Cancellation is not an error.
#[derive(Debug)]
pub enum CoreOutcome {
    Ready(Depot),
    Cancelled,
}

/// The loaded core: class registry plus package registry with installed
/// mapper tables.
///
/// Loading operations take `&Depot` and may run from any number of threads;
/// the class registry and mappers are read-only after `load_core` returns.
/// Teardown (`unload_class_packages`) requires exclusive access.
#[derive(Debug)]
pub struct Depot {
    classes: ClassRegistry,
    registry: PackageRegistry,
}

impl Depot {
    /// The class registry built from the class packages.
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// The package registry and mapper tables.
    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    /// A resolver bound to this context.
    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(&self.registry, &self.classes)
    }

    /// Drop every schema registered from class packages. Exclusive access
    /// makes this safe: no loader can be running concurrently.
    pub fn unload_class_packages(&mut self) {
        self.classes.unload_class_packages();
        info!("class packages unloaded");
    }
}

/// Run the full startup pipeline.
pub fn load_core(
    config: LoaderConfig,
    cancel: &CancelToken,
    progress: &ProgressFn<'_>,
) -> LoaderResult<CoreOutcome> {
    progress(ProgressEvent::stage("Enumerating root folder..."));
    if !config.content_root.is_dir() {
        return Err(LoaderError::Mapper(
            depot_mapper::MapperError::BadContentRoot(
                config.content_root.display().to_string(),
            ),
        ));
    }
    let registry = PackageRegistry::new(config.content_root.clone());
    let mut classes = ClassRegistry::new();

    if cancel.is_cancelled() {
        return Ok(CoreOutcome::Cancelled);
    }

    for name in &config.class_packages {
        progress(ProgressEvent::stage(format!("Loading {name}...")));
        load_class_package(&registry, &mut classes, name)?;
        if cancel.is_cancelled() {
            return Ok(CoreOutcome::Cancelled);
        }
    }

    progress(ProgressEvent::stage("Loading persistent data..."));
    let persistent = PersistentData::load(registry.root())?;
    if cancel.is_cancelled() {
        return Ok(CoreOutcome::Cancelled);
    }

    progress(ProgressEvent::stage("Loading mappers..."));
    let root = registry.root();
    let mappers = join_mapper_builds(
        || PackageMapper::build(root).map_err(Into::into),
        || CompositeMapper::build(root, &persistent).map_err(Into::into),
        || RedirectorMapper::build(&persistent).map_err(Into::into),
    )?;
    if cancel.is_cancelled() {
        return Ok(CoreOutcome::Cancelled);
    }
    registry.install_mappers(mappers);

    info!(classes = classes.len(), "core loaded");
    Ok(CoreOutcome::Ready(Depot { classes, registry }))
}

/// Load one schema-defining package and register every class it exports.
///
/// Idempotent: a package already processed is skipped. Any failure here is
/// fatal to startup, since later construction depends on these schemas.
pub fn load_class_package(
    registry: &PackageRegistry,
    classes: &mut ClassRegistry,
    name: &str,
) -> LoaderResult<()> {
    if classes.is_package_loaded(name) {
        return Ok(());
    }

    let entry = registry.get_by_name(name).map_err(|e| match e {
        LoaderError::PackageNotFound(_) => LoaderError::ClassPackage {
            name: name.to_string(),
            reason: "not found under the content root".to_string(),
        },
        other => other,
    })?;
    let package = entry.get_or_open()?;

    let mut registered = 0usize;
    for index in 0..package.exports().len() as u32 {
        if !is_class_definition(&package, index) {
            continue;
        }
        let object = package
            .object_at(index, classes)
            .map_err(|e| LoaderError::ClassPackage {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        if let ObjectPayload::ClassDef(schema) = &object.payload {
            classes.register_class(schema.clone());
            registered += 1;
        }
    }

    classes.mark_package_loaded(name);
    info!(package = %name, registered, "class package loaded");
    Ok(())
}

fn is_class_definition(package: &Package, index: u32) -> bool {
    package.exports()[index as usize].class_index.is_null()
}

/// Run the three mapper builds on parallel threads and join all of them.
///
/// The barrier is unconditional: a build that fails early never cancels its
/// siblings, so partial mapper state cannot escape. Only the first error is
/// kept; later ones are logged and suppressed.
pub(crate) fn join_mapper_builds<P, C, R>(
    build_package: P,
    build_composite: C,
    build_redirect: R,
) -> LoaderResult<MapperSet>
where
    P: FnOnce() -> LoaderResult<PackageMapper> + Send,
    C: FnOnce() -> LoaderResult<CompositeMapper> + Send,
    R: FnOnce() -> LoaderResult<RedirectorMapper> + Send,
{
    let first_error: Mutex<Option<LoaderError>> = Mutex::new(None);
    let record = |e: LoaderError| {
        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(e);
        } else {
            warn!(error = %e, "additional mapper failure suppressed");
        }
    };

    let package_slot: Mutex<Option<PackageMapper>> = Mutex::new(None);
    let composite_slot: Mutex<Option<CompositeMapper>> = Mutex::new(None);
    let redirect_slot: Mutex<Option<RedirectorMapper>> = Mutex::new(None);

    thread::scope(|s| {
        s.spawn(|| match build_package() {
            Ok(m) => *package_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(m),
            Err(e) => record(e),
        });
        s.spawn(|| match build_composite() {
            Ok(m) => *composite_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(m),
            Err(e) => record(e),
        });
        s.spawn(|| match build_redirect() {
            Ok(m) => *redirect_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(m),
            Err(e) => record(e),
        });
    });

    if let Some(e) = first_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
    {
        return Err(e);
    }

    Ok(MapperSet {
        package: take_slot(package_slot),
        composite: take_slot(composite_slot),
        redirector: take_slot(redirect_slot),
    })
}

fn take_slot<T>(slot: Mutex<Option<T>>) -> T {
    slot.into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .expect("mapper built without error")
}

//! Package registry, reference resolution, and startup orchestration.
//!
//! This crate ties the Depot core together:
//!
//! - [`PackageRegistry`] — process-wide cache of loaded/loading packages,
//!   keyed by normalized path, enforcing at-most-one parse per package
//! - [`ReferenceResolver`] — turns `PackageIndex` values into object
//!   handles, following imports across files via the mapper tables
//! - [`load_core`] — the startup pipeline: ordered class packages,
//!   persistent data, then the three mapper builds on parallel threads
//! - [`CancelToken`] / [`ProgressEvent`] — cooperative cancellation and
//!   progress hooks for the presentation layer
//!
//! Package loads are expected to run on background worker threads; every
//! type here is shareable across them once built.

pub mod cancel;
pub mod depot;
pub mod error;
pub mod progress;
pub mod registry;
pub mod resolver;

pub use cancel::CancelToken;
pub use depot::{
    load_class_package, load_core, CoreOutcome, Depot, LoaderConfig, DEFAULT_CLASS_PACKAGES,
};
pub use error::{LoaderError, LoaderResult};
pub use progress::{noop_progress, ProgressEvent, ProgressFn};
pub use registry::{PackageEntry, PackageRegistry};
pub use resolver::{ReferenceResolver, ResolveFailure, MAX_IMPORT_DEPTH};

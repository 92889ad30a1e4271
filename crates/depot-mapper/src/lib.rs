//! The mapper family: process-wide lookup tables built once at startup.
//!
//! Three independent mappers let the reference resolver find *which file*
//! holds an externally-referenced object:
//!
//! - [`PackageMapper`] — package name → absolute file path, from a one-time
//!   scan of the installed content root (assets may sit in nested
//!   directories)
//! - [`CompositeMapper`] — logical package name → a byte range inside a
//!   merged container file
//! - [`RedirectorMapper`] — moved/renamed object identity → its current
//!   canonical identity, followed to a fixed point with cycle detection
//!
//! Each mapper is immutable after its build and is shared freely across
//! loader threads. The composite and redirect tables come from the
//! persistent manifest the game's cooker drops at the content root; the
//! core only ever reads it.

pub mod composite;
pub mod error;
pub mod package_map;
pub mod persistent;
pub mod redirect;

pub use composite::{CompositeMapper, CompositeSlot};
pub use error::{MapperError, MapperResult};
pub use package_map::PackageMapper;
pub use persistent::{CompositeRecord, PersistentData, RedirectRecord, MANIFEST_FILE_NAME};
pub use redirect::RedirectorMapper;

/// The three mappers, bundled once all builds succeed.
#[derive(Debug)]
pub struct MapperSet {
    pub package: PackageMapper,
    pub composite: CompositeMapper,
    pub redirector: RedirectorMapper,
}

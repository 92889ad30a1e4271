//! Foundation types for Depot.
//!
//! This crate provides the identity and reference types used throughout the
//! Depot package loader. Every other Depot crate depends on `depot-types`.
//!
//! # Key Types
//!
//! - [`NameTable`] / [`NameRef`] — per-package interned string pool
//! - [`PackageIndex`] — signed reference distinguishing null/export/import
//! - [`ObjectFlags`] — per-export flag bits
//! - [`ObjectPath`] — dotted `Package.Outer.Object` identity
//! - [`PackageGuid`] — package identity GUID as stored in the summary

pub mod error;
pub mod flags;
pub mod guid;
pub mod index;
pub mod name;
pub mod path;
pub mod property;

pub use error::TypeError;
pub use flags::ObjectFlags;
pub use guid::PackageGuid;
pub use index::PackageIndex;
pub use name::{NameRef, NameTable, NONE_NAME};
pub use path::ObjectPath;
pub use property::PropertyType;

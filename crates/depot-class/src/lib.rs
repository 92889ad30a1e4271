//! Class registry for Depot.
//!
//! Content packages never describe the shape of their objects; that comes
//! from *class packages*: schema-defining containers loaded first. Each
//! class export carries a [`ClassSchema`] (parent name plus field list).
//! The [`ClassRegistry`] holds every registered class as a node in a
//! single-rooted inheritance tree and hands out construction seeds: an
//! export can only be materialized if its class name resolves to a known
//! node.
//!
//! The registry is built once during the class-package phase and is
//! read-only afterwards; loader threads share it behind an `Arc` without
//! locking.

pub mod error;
pub mod registry;
pub mod schema;

pub use error::{ClassError, ClassResult};
pub use registry::{ClassKind, ClassNode, ClassRegistry, ObjectSeed};
pub use schema::{ClassSchema, FieldSchema};

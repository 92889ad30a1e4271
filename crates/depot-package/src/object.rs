//! Materialized objects.

use depot_class::{ClassError, ClassSchema};
use depot_stream::StreamError;
use depot_types::{ObjectFlags, ObjectPath, PackageIndex, TypeError};
use thiserror::Error;

use crate::property::{DecodedProperties, Property, PropertyError, SkippedProperty};

/// Errors that fail a single object's construction; its package keeps
/// loading other exports.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error(transparent)]
    Class(#[from] ClassError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("serialized range [{offset}, {offset}+{size}) exceeds payload ({payload} bytes)")]
    SerialRangeOutOfRange {
        offset: u32,
        size: u32,
        payload: usize,
    },

    #[error("no export at index {index} (table holds {count})")]
    NoSuchExport { index: u32, count: usize },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Names(#[from] TypeError),
}

pub type ObjectResult<T> = Result<T, ObjectError>;

/// Decoded payload of a materialized object, keyed by its class kind.
#[derive(Clone, Debug)]
pub enum ObjectPayload {
    /// Property-bag content object.
    Fields(DecodedProperties),
    /// A class definition from a schema package.
    ClassDef(ClassSchema),
    /// A moved/renamed stand-in pointing at the real object.
    Redirector { target: ObjectPath },
}

impl ObjectPayload {
    /// Decoded properties, if this is a content object.
    pub fn fields(&self) -> Option<&DecodedProperties> {
        match self {
            Self::Fields(decoded) => Some(decoded),
            _ => None,
        }
    }
}

/// One materialized export.
///
/// Exactly one instance exists per (package, export index); the package's
/// object cache hands out clones of the same `Arc`.
#[derive(Clone, Debug)]
pub struct LoadedObject {
    pub export_index: u32,
    pub name: String,
    pub class_name: String,
    pub outer: PackageIndex,
    pub flags: ObjectFlags,
    pub payload: ObjectPayload,
}

impl LoadedObject {
    /// Properties skipped during decoding (schema drift diagnostics).
    pub fn skipped_properties(&self) -> &[SkippedProperty] {
        match &self.payload {
            ObjectPayload::Fields(decoded) => &decoded.skipped,
            _ => &[],
        }
    }

    /// Convenience lookup into a content object's properties.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.payload.fields().and_then(|f| f.get(name))
    }
}

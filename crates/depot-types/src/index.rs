//! Signed package references.
//!
//! On the wire a reference is a signed 32-bit integer: zero is null, a
//! positive value is a 1-based index into the local export table, a negative
//! value is a 1-based index into the local import table. [`PackageIndex`]
//! makes the three interpretations explicit so cross-package indirection is
//! visible in the type system instead of hiding behind raw integers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A decoded package reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageIndex {
    /// No object.
    Null,
    /// 0-based index into the local export table.
    Export(u32),
    /// 0-based index into the local import table.
    Import(u32),
}

impl PackageIndex {
    /// Decode the wire representation.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Null,
            n if n > 0 => Self::Export((n - 1) as u32),
            n => Self::Import((-(n + 1)) as u32),
        }
    }

    /// Encode back to the wire representation.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Null => 0,
            Self::Export(i) => i as i32 + 1,
            Self::Import(i) => -(i as i32 + 1),
        }
    }

    /// Returns `true` for [`PackageIndex::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The export slot, or an error for null/import references.
    pub fn export_index(&self) -> Result<u32, TypeError> {
        match self {
            Self::Export(i) => Ok(*i),
            other => Err(TypeError::NotAnExport(other.to_raw())),
        }
    }

    /// The import slot, or an error for null/export references.
    pub fn import_index(&self) -> Result<u32, TypeError> {
        match self {
            Self::Import(i) => Ok(*i),
            other => Err(TypeError::NotAnImport(other.to_raw())),
        }
    }
}

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Export(i) => write!(f, "Export({i})"),
            Self::Import(i) => write!(f, "Import({i})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_null() {
        assert_eq!(PackageIndex::from_raw(0), PackageIndex::Null);
        assert!(PackageIndex::from_raw(0).is_null());
    }

    #[test]
    fn positive_is_one_based_export() {
        assert_eq!(PackageIndex::from_raw(1), PackageIndex::Export(0));
        assert_eq!(PackageIndex::from_raw(7), PackageIndex::Export(6));
    }

    #[test]
    fn negative_is_one_based_import() {
        assert_eq!(PackageIndex::from_raw(-1), PackageIndex::Import(0));
        assert_eq!(PackageIndex::from_raw(-3), PackageIndex::Import(2));
    }

    #[test]
    fn accessors_reject_wrong_arm() {
        assert!(PackageIndex::Null.export_index().is_err());
        assert!(PackageIndex::Export(0).import_index().is_err());
        assert_eq!(PackageIndex::Import(4).import_index().unwrap(), 4);
    }

    proptest! {
        #[test]
        fn raw_roundtrip(raw in -1_000_000i32..1_000_000) {
            prop_assert_eq!(PackageIndex::from_raw(raw).to_raw(), raw);
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Package identity GUID as stored in the summary.
///
/// Sixteen raw bytes on the wire; formatted with the standard hyphenated
/// layout for display and JSON reports.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageGuid(Uuid);

impl PackageGuid {
    /// Wrap raw summary bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Read from a slice, validating length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidGuidLength(bytes.len()))?;
        Ok(Self::from_bytes(arr))
    }

    /// The all-zero GUID used by fixtures and unsaved packages.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` for the all-zero GUID.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for PackageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageGuid({})", self.0.hyphenated())
    }
}

impl fmt::Display for PackageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

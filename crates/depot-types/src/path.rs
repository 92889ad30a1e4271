//! Dotted object identities.
//!
//! Cross-package metadata (redirector tables, composite slots, diagnostics)
//! names objects by a dotted path: the owning package first, then each outer
//! in containment order, then the object itself (`Village.Props.Barrel`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A `Package.Outer.Object` identity.
///
/// Comparison and hashing are case-insensitive, matching name semantics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath {
    segments: Vec<String>,
    key: String,
}

impl ObjectPath {
    /// Parse a dotted path. At least one segment; empty segments rejected.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let segments: Vec<String> = text.split('.').map(str::to_string).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(TypeError::InvalidPath(text.to_string()));
        }
        let key = text.to_ascii_lowercase();
        Ok(Self { segments, key })
    }

    /// Build from parts, package first.
    pub fn from_segments(segments: Vec<String>) -> Result<Self, TypeError> {
        let joined = segments.join(".");
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(TypeError::InvalidPath(joined));
        }
        let key = joined.to_ascii_lowercase();
        Ok(Self { segments, key })
    }

    /// The owning package name (first segment).
    pub fn package(&self) -> &str {
        &self.segments[0]
    }

    /// The object's own name (last segment).
    pub fn object(&self) -> &str {
        self.segments.last().expect("paths hold at least one segment")
    }

    /// All segments, package first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The lowercase lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for ObjectPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ObjectPath {}

impl std::hash::Hash for ObjectPath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.to_string()
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-export object flag bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectFlags(pub u32);

impl ObjectFlags {
    /// Visible to other packages.
    pub const PUBLIC: ObjectFlags = ObjectFlags(1 << 0);
    /// Keeps the object alive independent of referencers.
    pub const STANDALONE: ObjectFlags = ObjectFlags(1 << 1);
    /// The class-default template object of its class.
    pub const CLASS_DEFAULT: ObjectFlags = ObjectFlags(1 << 2);
    /// Never saved back to disk.
    pub const TRANSIENT: ObjectFlags = ObjectFlags(1 << 3);

    /// The empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if every bit of `other` is set.
    pub fn contains(&self, other: ObjectFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    pub fn union(&self, other: ObjectFlags) -> ObjectFlags {
        ObjectFlags(self.0 | other.0)
    }

    /// The raw bit pattern.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjectFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::PUBLIC) {
            names.push("PUBLIC");
        }
        if self.contains(Self::STANDALONE) {
            names.push("STANDALONE");
        }
        if self.contains(Self::CLASS_DEFAULT) {
            names.push("CLASS_DEFAULT");
        }
        if self.contains(Self::TRANSIENT) {
            names.push("TRANSIENT");
        }
        write!(f, "ObjectFlags({:#x}: {})", self.0, names.join("|"))
    }
}

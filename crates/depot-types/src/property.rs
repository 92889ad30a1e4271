//! Property type tags.
//!
//! Each property tag in an object's payload declares its value type as a
//! single byte. The tag drives decoding entirely; nothing about a target
//! type's in-memory layout ever does.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a property tag payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Byte,
    Int,
    Bool,
    Float,
    Str,
    Name,
    Object,
    Enum,
    Struct,
    Array,
}

impl PropertyType {
    /// Decode the wire byte. Unknown bytes yield `None`; the caller decides
    /// whether that fails the object or the whole stream.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Byte),
            2 => Some(Self::Int),
            3 => Some(Self::Bool),
            4 => Some(Self::Float),
            5 => Some(Self::Str),
            6 => Some(Self::Name),
            7 => Some(Self::Object),
            8 => Some(Self::Enum),
            9 => Some(Self::Struct),
            10 => Some(Self::Array),
            _ => None,
        }
    }

    /// Encode to the wire byte.
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Byte => 1,
            Self::Int => 2,
            Self::Bool => 3,
            Self::Float => 4,
            Self::Str => 5,
            Self::Name => 6,
            Self::Object => 7,
            Self::Enum => 8,
            Self::Struct => 9,
            Self::Array => 10,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "Byte",
            Self::Int => "Int",
            Self::Bool => "Bool",
            Self::Float => "Float",
            Self::Str => "Str",
            Self::Name => "Name",
            Self::Object => "Object",
            Self::Enum => "Enum",
            Self::Struct => "Struct",
            Self::Array => "Array",
        };
        write!(f, "{name}Property")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip_all_variants() {
        for byte in 1..=10u8 {
            let ty = PropertyType::from_wire(byte).unwrap();
            assert_eq!(ty.to_wire(), byte);
        }
    }

    #[test]
    fn unknown_wire_bytes_rejected() {
        assert!(PropertyType::from_wire(0).is_none());
        assert!(PropertyType::from_wire(11).is_none());
        assert!(PropertyType::from_wire(255).is_none());
    }
}

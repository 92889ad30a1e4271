//! Tag-driven property decoding.
//!
//! An object's payload is a sequence of self-describing tags terminated by
//! the tag whose name is `None`. Each tag declares its name, type, payload
//! size, and array slot. Decoding is driven entirely by the tag, never by
//! the in-memory layout of any target type. That is what lets old readers
//! skip properties added later and new readers skip properties since
//! removed, by advancing exactly the declared size.

use depot_class::ObjectSeed;
use depot_stream::{Cursor, StreamError, Writer};
use depot_types::{NameRef, NameTable, PackageIndex, PropertyType, TypeError};
use thiserror::Error;
use tracing::debug;

/// Errors that are fatal to the object being decoded, not to its package.
#[derive(Debug, Error, PartialEq)]
pub enum PropertyError {
    #[error("property {name} has unknown type byte {byte}")]
    UnknownTypeByte { name: String, byte: u8 },

    #[error("property {name} declared {declared} bytes but decoding consumed {consumed}")]
    SizeMismatch {
        name: String,
        declared: u32,
        consumed: u32,
    },

    #[error("array property {name} declares nested array elements")]
    NestedArray { name: String },

    #[error("property stream ended before the terminator tag")]
    MissingTerminator(#[source] StreamError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Names(#[from] TypeError),
}

pub type PropertyResult<T> = Result<T, PropertyError>;

/// A decoded property tag, before its payload is interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyTag {
    pub name: NameRef,
    pub ty: PropertyType,
    pub size: u32,
    pub array_index: u32,
}

/// A decoded value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Byte(u8),
    Int(i32),
    Bool(bool),
    Float(f32),
    Str(String),
    Name(String),
    /// Unresolved reference; the resolver turns it into an object handle on
    /// demand.
    Object(PackageIndex),
    Enum { enum_name: String, value: String },
    Struct {
        struct_name: String,
        fields: Vec<Property>,
    },
    Array(Vec<PropertyValue>),
}

/// A named, decoded property.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: String,
    pub array_index: u32,
    pub value: PropertyValue,
}

/// A property that was skipped without decoding, with the reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedProperty {
    pub name: String,
    pub ty: PropertyType,
    pub size: u32,
    pub reason: SkipReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No field of this name on the object's class (schema drift).
    UnknownField,
    /// The field exists but with a different declared type.
    TypeMismatch,
}

/// Outcome of decoding one tag stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedProperties {
    pub properties: Vec<Property>,
    pub skipped: Vec<SkippedProperty>,
}

impl DecodedProperties {
    /// Look up a decoded property by name, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Decode a tag stream until the `None` terminator.
///
/// With a seed, only tags matching a schema field by name *and* type are
/// decoded; everything else is skipped by exactly its declared size,
/// keeping the stream aligned for the tags that follow. Without a seed
/// (struct interiors) every well-formed tag is decoded.
pub fn decode_properties(
    cursor: &mut Cursor<'_>,
    names: &NameTable,
    seed: Option<&ObjectSeed>,
) -> PropertyResult<DecodedProperties> {
    let mut decoded = DecodedProperties::default();

    while let Some(tag) = read_tag(cursor, names)? {
        let name = names.get(tag.name)?.to_string();

        let skip_reason = match seed {
            None => None,
            Some(seed) => match seed.field(&name) {
                None => Some(SkipReason::UnknownField),
                Some(field) if field.ty != tag.ty => Some(SkipReason::TypeMismatch),
                Some(_) => None,
            },
        };

        if let Some(reason) = skip_reason {
            // Unknown layout: consume exactly the declared size, never guess.
            cursor.skip(tag.size as usize)?;
            debug!(property = %name, ty = %tag.ty, size = tag.size, "skipped property");
            decoded.skipped.push(SkippedProperty {
                name,
                ty: tag.ty,
                size: tag.size,
                reason,
            });
            continue;
        }

        let before = cursor.pos();
        let value = decode_value(cursor, names, tag.ty, &name)?;
        let consumed = (cursor.pos() - before) as u32;
        if consumed != tag.size {
            return Err(PropertyError::SizeMismatch {
                name,
                declared: tag.size,
                consumed,
            });
        }

        decoded.properties.push(Property {
            name,
            array_index: tag.array_index,
            value,
        });
    }
    Ok(decoded)
}

/// Read the next tag, or `None` at the terminator.
fn read_tag(cursor: &mut Cursor<'_>, names: &NameTable) -> PropertyResult<Option<PropertyTag>> {
    let name = cursor
        .read_name_ref()
        .map_err(PropertyError::MissingTerminator)?;
    if names.is_none(name) {
        return Ok(None);
    }
    let display = names.get(name)?.to_string();
    let type_byte = cursor.read_u8()?;
    let ty = PropertyType::from_wire(type_byte).ok_or(PropertyError::UnknownTypeByte {
        name: display,
        byte: type_byte,
    })?;
    let size = cursor.read_u32()?;
    let array_index = cursor.read_u32()?;
    Ok(Some(PropertyTag {
        name,
        ty,
        size,
        array_index,
    }))
}

fn decode_value(
    cursor: &mut Cursor<'_>,
    names: &NameTable,
    ty: PropertyType,
    name: &str,
) -> PropertyResult<PropertyValue> {
    Ok(match ty {
        PropertyType::Byte => PropertyValue::Byte(cursor.read_u8()?),
        PropertyType::Int => PropertyValue::Int(cursor.read_i32()?),
        PropertyType::Bool => PropertyValue::Bool(cursor.read_u8()? != 0),
        PropertyType::Float => PropertyValue::Float(cursor.read_f32()?),
        PropertyType::Str => PropertyValue::Str(cursor.read_string()?),
        PropertyType::Name => {
            let name_ref = cursor.read_name_ref()?;
            PropertyValue::Name(names.get(name_ref)?.to_string())
        }
        PropertyType::Object => PropertyValue::Object(cursor.read_package_index()?),
        PropertyType::Enum => {
            let enum_ref = cursor.read_name_ref()?;
            let value_ref = cursor.read_name_ref()?;
            PropertyValue::Enum {
                enum_name: names.get(enum_ref)?.to_string(),
                value: names.get(value_ref)?.to_string(),
            }
        }
        PropertyType::Struct => {
            let struct_ref = cursor.read_name_ref()?;
            let struct_name = names.get(struct_ref)?.to_string();
            // Struct interiors carry their own tags; admit all of them.
            let inner = decode_properties(cursor, names, None)?;
            PropertyValue::Struct {
                struct_name,
                fields: inner.properties,
            }
        }
        PropertyType::Array => {
            let count = cursor.read_u32()?;
            let elem_byte = cursor.read_u8()?;
            let elem_ty = PropertyType::from_wire(elem_byte).ok_or_else(|| {
                PropertyError::UnknownTypeByte {
                    name: name.to_string(),
                    byte: elem_byte,
                }
            })?;
            if elem_ty == PropertyType::Array {
                return Err(PropertyError::NestedArray {
                    name: name.to_string(),
                });
            }
            let mut elements = Vec::with_capacity(count as usize);
            for _ in 0..count {
                elements.push(decode_value(cursor, names, elem_ty, name)?);
            }
            PropertyValue::Array(elements)
        }
    })
}

/// Writer-side twin of [`decode_properties`], used by the builder and by
/// tests to produce byte-exact payloads.
pub struct TagWriter<'a> {
    names: &'a mut NameTable,
    w: Writer,
}

impl<'a> TagWriter<'a> {
    pub fn new(names: &'a mut NameTable) -> Self {
        Self {
            names,
            w: Writer::new(),
        }
    }

    pub fn byte(mut self, name: &str, value: u8) -> Self {
        let mut payload = Writer::new();
        payload.write_u8(value);
        self.tag(name, PropertyType::Byte, payload.into_bytes(), 0);
        self
    }

    pub fn int(mut self, name: &str, value: i32) -> Self {
        let mut payload = Writer::new();
        payload.write_i32(value);
        self.tag(name, PropertyType::Int, payload.into_bytes(), 0);
        self
    }

    pub fn bool(mut self, name: &str, value: bool) -> Self {
        let mut payload = Writer::new();
        payload.write_u8(value as u8);
        self.tag(name, PropertyType::Bool, payload.into_bytes(), 0);
        self
    }

    pub fn float(mut self, name: &str, value: f32) -> Self {
        let mut payload = Writer::new();
        payload.write_f32(value);
        self.tag(name, PropertyType::Float, payload.into_bytes(), 0);
        self
    }

    pub fn str(mut self, name: &str, value: &str) -> Self {
        let mut payload = Writer::new();
        payload.write_string(value);
        self.tag(name, PropertyType::Str, payload.into_bytes(), 0);
        self
    }

    pub fn name(mut self, name: &str, value: &str) -> Self {
        let value_ref = self.names.intern(value);
        let mut payload = Writer::new();
        payload.write_name_ref(value_ref);
        self.tag(name, PropertyType::Name, payload.into_bytes(), 0);
        self
    }

    pub fn object(mut self, name: &str, index: PackageIndex) -> Self {
        self.object_at(name, index, 0)
    }

    /// Object reference into a fixed-size array slot.
    pub fn object_at(mut self, name: &str, index: PackageIndex, array_index: u32) -> Self {
        let mut payload = Writer::new();
        payload.write_package_index(index);
        self.tag(name, PropertyType::Object, payload.into_bytes(), array_index);
        self
    }

    pub fn enumeration(mut self, name: &str, enum_name: &str, value: &str) -> Self {
        let enum_ref = self.names.intern(enum_name);
        let value_ref = self.names.intern(value);
        let mut payload = Writer::new();
        payload.write_name_ref(enum_ref);
        payload.write_name_ref(value_ref);
        self.tag(name, PropertyType::Enum, payload.into_bytes(), 0);
        self
    }

    /// Struct property; `build` writes the interior tags.
    pub fn strct(
        mut self,
        name: &str,
        struct_name: &str,
        build: impl FnOnce(TagWriter<'_>) -> TagWriter<'_>,
    ) -> Self {
        let struct_ref = self.names.intern(struct_name);
        let inner = build(TagWriter::new(self.names)).finish();
        let mut payload = Writer::new();
        payload.write_name_ref(struct_ref);
        payload.write_bytes(&inner);
        self.tag(name, PropertyType::Struct, payload.into_bytes(), 0);
        self
    }

    /// Array of int elements; enough for fixtures without a generic element
    /// builder.
    pub fn int_array(mut self, name: &str, values: &[i32]) -> Self {
        let mut payload = Writer::new();
        payload.write_u32(values.len() as u32);
        payload.write_u8(PropertyType::Int.to_wire());
        for v in values {
            payload.write_i32(*v);
        }
        self.tag(name, PropertyType::Array, payload.into_bytes(), 0);
        self
    }

    /// Array of object references.
    pub fn object_array(mut self, name: &str, values: &[PackageIndex]) -> Self {
        let mut payload = Writer::new();
        payload.write_u32(values.len() as u32);
        payload.write_u8(PropertyType::Object.to_wire());
        for v in values {
            payload.write_package_index(*v);
        }
        self.tag(name, PropertyType::Array, payload.into_bytes(), 0);
        self
    }

    /// Emit a raw tag, for fixtures that need exact or deliberately wrong
    /// bytes.
    pub fn raw(mut self, name: &str, ty: PropertyType, payload: Vec<u8>, array_index: u32) -> Self {
        self.tag(name, ty, payload, array_index);
        self
    }

    /// Write the terminator and return the payload bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let none_ref = self.names.intern(depot_types::NONE_NAME);
        self.w.write_name_ref(none_ref);
        self.w.into_bytes()
    }

    fn tag(&mut self, name: &str, ty: PropertyType, payload: Vec<u8>, array_index: u32) {
        let name_ref = self.names.intern(name);
        self.w.write_name_ref(name_ref);
        self.w.write_u8(ty.to_wire());
        self.w.write_u32(payload.len() as u32);
        self.w.write_u32(array_index);
        self.w.write_bytes(&payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_class::{ClassRegistry, ClassSchema, FieldSchema};
    use proptest::prelude::*;

    fn seed_with(fields: Vec<(&str, PropertyType)>) -> ObjectSeed {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "Fixture".into(),
            parent: None,
            fields: fields
                .into_iter()
                .map(|(name, ty)| FieldSchema {
                    name: name.into(),
                    ty,
                })
                .collect(),
        });
        registry.construct("Fixture").unwrap()
    }

    #[test]
    fn scalar_properties_decode() {
        let mut names = NameTable::new();
        let payload = TagWriter::new(&mut names)
            .int("Count", 42)
            .float("Scale", 2.5)
            .bool("Visible", true)
            .str("Label", "barrel")
            .finish();

        let seed = seed_with(vec![
            ("Count", PropertyType::Int),
            ("Scale", PropertyType::Float),
            ("Visible", PropertyType::Bool),
            ("Label", PropertyType::Str),
        ]);
        let decoded =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();

        assert_eq!(decoded.properties.len(), 4);
        assert_eq!(decoded.get("count").unwrap().value, PropertyValue::Int(42));
        assert_eq!(
            decoded.get("Label").unwrap().value,
            PropertyValue::Str("barrel".into())
        );
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn unknown_property_skipped_by_declared_size() {
        let mut names = NameTable::new();
        let payload = TagWriter::new(&mut names)
            .raw("Ghost", PropertyType::Struct, vec![0xAB; 37], 0)
            .int("Count", 7)
            .finish();

        let seed = seed_with(vec![("Count", PropertyType::Int)]);
        let decoded =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();

        // The unknown tag is consumed exactly; the following tag decodes.
        assert_eq!(decoded.properties.len(), 1);
        assert_eq!(decoded.get("Count").unwrap().value, PropertyValue::Int(7));
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].name, "Ghost");
        assert_eq!(decoded.skipped[0].size, 37);
        assert_eq!(decoded.skipped[0].reason, SkipReason::UnknownField);
    }

    #[test]
    fn type_mismatch_skipped_not_misdecoded() {
        let mut names = NameTable::new();
        let payload = TagWriter::new(&mut names)
            .str("Count", "not an int")
            .int("Count", 3)
            .finish();

        let seed = seed_with(vec![("Count", PropertyType::Int)]);
        let decoded =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();

        assert_eq!(decoded.properties.len(), 1);
        assert_eq!(decoded.get("Count").unwrap().value, PropertyValue::Int(3));
        assert_eq!(decoded.skipped[0].reason, SkipReason::TypeMismatch);
    }

    #[test]
    fn struct_recurses_with_own_terminator() {
        let mut names = NameTable::new();
        let payload = TagWriter::new(&mut names)
            .strct("Location", "Vector", |w| {
                w.float("X", 1.0).float("Y", 2.0).float("Z", 3.0)
            })
            .int("Count", 9)
            .finish();

        let seed = seed_with(vec![
            ("Location", PropertyType::Struct),
            ("Count", PropertyType::Int),
        ]);
        let decoded =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();

        match &decoded.get("Location").unwrap().value {
            PropertyValue::Struct {
                struct_name,
                fields,
            } => {
                assert_eq!(struct_name, "Vector");
                assert_eq!(fields.len(), 3);
                assert_eq!(fields[1].value, PropertyValue::Float(2.0));
            }
            other => panic!("expected struct, got {other:?}"),
        }
        assert_eq!(decoded.get("Count").unwrap().value, PropertyValue::Int(9));
    }

    #[test]
    fn arrays_decode_elementwise() {
        let mut names = NameTable::new();
        let payload = TagWriter::new(&mut names)
            .int_array("Weights", &[3, 1, 4])
            .object_array(
                "Meshes",
                &[PackageIndex::Export(0), PackageIndex::Import(1)],
            )
            .finish();

        let seed = seed_with(vec![
            ("Weights", PropertyType::Array),
            ("Meshes", PropertyType::Array),
        ]);
        let decoded =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();

        assert_eq!(
            decoded.get("Weights").unwrap().value,
            PropertyValue::Array(vec![
                PropertyValue::Int(3),
                PropertyValue::Int(1),
                PropertyValue::Int(4),
            ])
        );
        match &decoded.get("Meshes").unwrap().value {
            PropertyValue::Array(elements) => {
                assert_eq!(elements[1], PropertyValue::Object(PackageIndex::Import(1)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn enum_decodes_both_names() {
        let mut names = NameTable::new();
        let payload = TagWriter::new(&mut names)
            .enumeration("Blend", "EBlendMode", "BLEND_Masked")
            .finish();

        let seed = seed_with(vec![("Blend", PropertyType::Enum)]);
        let decoded =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();
        assert_eq!(
            decoded.get("Blend").unwrap().value,
            PropertyValue::Enum {
                enum_name: "EBlendMode".into(),
                value: "BLEND_Masked".into(),
            }
        );
    }

    #[test]
    fn size_mismatch_is_fatal_to_object() {
        let mut names = NameTable::new();
        // Declared size 8, but an Int payload only consumes 4.
        let mut bad = Writer::new();
        bad.write_i32(5);
        bad.write_u32(0xFFFF_FFFF);
        let payload = TagWriter::new(&mut names)
            .raw("Count", PropertyType::Int, bad.into_bytes(), 0)
            .finish();

        let seed = seed_with(vec![("Count", PropertyType::Int)]);
        let err =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap_err();
        assert_eq!(
            err,
            PropertyError::SizeMismatch {
                name: "Count".into(),
                declared: 8,
                consumed: 4,
            }
        );
    }

    #[test]
    fn missing_terminator_detected() {
        let mut names = NameTable::new();
        let mut payload = TagWriter::new(&mut names).int("Count", 1).finish();
        payload.truncate(payload.len() - 4); // chop the None tag

        let seed = seed_with(vec![("Count", PropertyType::Int)]);
        let err =
            decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap_err();
        assert!(matches!(err, PropertyError::MissingTerminator(_)));
    }

    #[test]
    fn unknown_type_byte_is_fatal_to_object() {
        let mut names = NameTable::new();
        let ghost = names.intern("Ghost");
        names.intern("None");
        let mut w = Writer::new();
        w.write_name_ref(ghost);
        w.write_u8(0xEE);
        let payload = w.into_bytes();

        let err = decode_properties(&mut Cursor::new(&payload), &names, None).unwrap_err();
        assert!(matches!(err, PropertyError::UnknownTypeByte { byte: 0xEE, .. }));
    }

    proptest! {
        /// Alignment property: an unknown tag of any size S is skipped by
        /// exactly S bytes and the stream stays decodable.
        #[test]
        fn skip_preserves_alignment(size in 0usize..512, fill in any::<u8>()) {
            let mut names = NameTable::new();
            let payload = TagWriter::new(&mut names)
                .raw("Ghost", PropertyType::Str, vec![fill; size], 0)
                .int("Sentinel", 1234)
                .finish();

            let seed = seed_with(vec![("Sentinel", PropertyType::Int)]);
            let decoded =
                decode_properties(&mut Cursor::new(&payload), &names, Some(&seed)).unwrap();
            prop_assert_eq!(decoded.skipped[0].size as usize, size);
            prop_assert_eq!(
                &decoded.get("Sentinel").unwrap().value,
                &PropertyValue::Int(1234)
            );
        }
    }
}

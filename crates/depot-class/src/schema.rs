//! Class schemas as serialized inside class-package exports.
//!
//! A class export's payload is: parent class name (empty string for the
//! root), then a u32 field count, then each field as (string name, type
//! byte). The deserializer later admits only property names present in the
//! flattened field list of the object's class.

use depot_stream::{Cursor, StreamResult, Writer};
use depot_types::PropertyType;

use crate::error::{ClassError, ClassResult};

/// One declared property slot on a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub ty: PropertyType,
}

/// A class definition read from a class-package export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassSchema {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<FieldSchema>,
}

impl ClassSchema {
    /// Decode a schema payload. `name` comes from the export record, not
    /// the payload.
    pub fn parse(name: &str, cursor: &mut Cursor<'_>) -> ClassResult<Self> {
        let parent = read(cursor.read_string(), name)?;
        let parent = if parent.is_empty() { None } else { Some(parent) };

        let count = read(cursor.read_u32(), name)?;
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let field_name = read(cursor.read_string(), name)?;
            let byte = read(cursor.read_u8(), name)?;
            let ty = PropertyType::from_wire(byte).ok_or_else(|| {
                ClassError::MalformedSchema(format!(
                    "class {name}: field {field_name} has unknown type byte {byte}"
                ))
            })?;
            fields.push(FieldSchema {
                name: field_name,
                ty,
            });
        }
        Ok(Self {
            name: name.to_string(),
            parent,
            fields,
        })
    }

    /// Encode the payload written into a class-package export.
    pub fn write(&self, w: &mut Writer) {
        w.write_string(self.parent.as_deref().unwrap_or(""));
        w.write_u32(self.fields.len() as u32);
        for field in &self.fields {
            w.write_string(&field.name);
            w.write_u8(field.ty.to_wire());
        }
    }
}

fn read<T>(result: StreamResult<T>, class: &str) -> ClassResult<T> {
    result.map_err(|e| ClassError::MalformedSchema(format!("class {class}: {e}")))
}

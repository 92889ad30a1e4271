//! The class registry proper.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{ClassError, ClassResult};
use crate::schema::{ClassSchema, FieldSchema};

/// What a class's instances decode as.
///
/// Schema-registered classes are plain [`ClassKind::Object`]; the special
/// kinds belong to the intrinsic classes every schema package assumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// Ordinary content object: payload is a property-tag stream.
    Object,
    /// A class definition: payload is a [`ClassSchema`].
    Class,
    /// A stand-in recording that the real object moved: payload is the
    /// target object path.
    Redirector,
    /// A nested package grouping node; no payload of its own.
    Package,
}

/// One node in the inheritance tree.
#[derive(Clone, Debug)]
pub struct ClassNode {
    pub name: String,
    pub parent: Option<String>,
    pub kind: ClassKind,
    pub fields: Vec<FieldSchema>,
}

/// Everything the materializer needs to construct an instance of a class:
/// the decode kind and the flattened (inherited) field schema.
#[derive(Clone, Debug)]
pub struct ObjectSeed {
    pub class_name: String,
    pub kind: ClassKind,
    pub fields: Vec<FieldSchema>,
}

impl ObjectSeed {
    /// Schema lookup used by the property deserializer to admit a tag.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// Registry of every known class, keyed case-insensitively by name.
///
/// Mutated only while class packages load; shared immutably afterwards.
#[derive(Debug)]
pub struct ClassRegistry {
    nodes: HashMap<String, ClassNode>,
    loaded_packages: HashSet<String>,
}

impl ClassRegistry {
    /// A registry pre-seeded with the intrinsic classes (`Object`, `Class`,
    /// `Package`, `ObjectRedirector`) that class packages build upon.
    pub fn new() -> Self {
        let mut registry = Self {
            nodes: HashMap::new(),
            loaded_packages: HashSet::new(),
        };
        registry.insert_intrinsic("Object", None, ClassKind::Object);
        registry.insert_intrinsic("Class", Some("Object"), ClassKind::Class);
        registry.insert_intrinsic("Package", Some("Object"), ClassKind::Package);
        registry.insert_intrinsic("ObjectRedirector", Some("Object"), ClassKind::Redirector);
        registry
    }

    fn insert_intrinsic(&mut self, name: &str, parent: Option<&str>, kind: ClassKind) {
        self.nodes.insert(
            name.to_ascii_lowercase(),
            ClassNode {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                kind,
                fields: Vec::new(),
            },
        );
    }

    /// Register a class parsed from a class package.
    ///
    /// Re-registering an existing name keeps the first definition; class
    /// packages are idempotent, so this is expected on reload.
    pub fn register_class(&mut self, schema: ClassSchema) {
        let key = schema.name.to_ascii_lowercase();
        if self.nodes.contains_key(&key) {
            warn!(class = %schema.name, "class already registered; keeping first definition");
            return;
        }
        debug!(class = %schema.name, fields = schema.fields.len(), "registered class");
        self.nodes.insert(
            key,
            ClassNode {
                name: schema.name,
                parent: schema.parent.or_else(|| Some("Object".to_string())),
                kind: ClassKind::Object,
                fields: schema.fields,
            },
        );
    }

    /// Look up a class node by name.
    pub fn resolve(&self, name: &str) -> Option<&ClassNode> {
        self.nodes.get(&name.to_ascii_lowercase())
    }

    /// Number of registered classes, intrinsics included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: intrinsics are seeded in `new`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a construction seed for `class_name`.
    ///
    /// Flattens the field schemas along the inheritance chain, own fields
    /// first. An unknown class or a broken chain fails only the object
    /// being constructed, never its package.
    pub fn construct(&self, class_name: &str) -> ClassResult<ObjectSeed> {
        let node = self
            .resolve(class_name)
            .ok_or_else(|| ClassError::UnknownClass(class_name.to_string()))?;

        let mut fields = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(node);
        while let Some(n) = current {
            if !visited.insert(n.name.to_ascii_lowercase()) {
                return Err(ClassError::InheritanceCycle(n.name.clone()));
            }
            fields.extend(n.fields.iter().cloned());
            current = match &n.parent {
                Some(parent) => Some(self.resolve(parent).ok_or_else(|| {
                    ClassError::UnknownParent {
                        class: n.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
        }

        Ok(ObjectSeed {
            class_name: node.name.clone(),
            kind: node.kind,
            fields,
        })
    }

    /// Record that a class package has been processed.
    pub fn mark_package_loaded(&mut self, package_name: &str) {
        self.loaded_packages.insert(package_name.to_ascii_lowercase());
    }

    /// Returns `true` if the package was already processed, making a reload
    /// a no-op.
    pub fn is_package_loaded(&self, package_name: &str) -> bool {
        self.loaded_packages.contains(&package_name.to_ascii_lowercase())
    }

    /// Drop everything registered from class packages, keeping intrinsics.
    pub fn unload_class_packages(&mut self) {
        self.nodes.retain(|_, node| {
            matches!(
                node.name.as_str(),
                "Object" | "Class" | "Package" | "ObjectRedirector"
            )
        });
        self.loaded_packages.clear();
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_types::PropertyType;

    fn field(name: &str, ty: PropertyType) -> FieldSchema {
        FieldSchema {
            name: name.into(),
            ty,
        }
    }

    #[test]
    fn intrinsics_present() {
        let registry = ClassRegistry::new();
        assert!(registry.resolve("Object").is_some());
        assert_eq!(
            registry.resolve("objectredirector").unwrap().kind,
            ClassKind::Redirector
        );
    }

    #[test]
    fn construct_unknown_class_fails() {
        let registry = ClassRegistry::new();
        let err = registry.construct("StaticMesh").unwrap_err();
        assert_eq!(err, ClassError::UnknownClass("StaticMesh".into()));
    }

    #[test]
    fn construct_flattens_inheritance() {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "Actor".into(),
            parent: None, // defaults to Object
            fields: vec![field("Location", PropertyType::Struct)],
        });
        registry.register_class(ClassSchema {
            name: "Light".into(),
            parent: Some("Actor".into()),
            fields: vec![field("Brightness", PropertyType::Float)],
        });

        let seed = registry.construct("light").unwrap();
        assert_eq!(seed.class_name, "Light");
        assert_eq!(seed.kind, ClassKind::Object);
        assert!(seed.field("Brightness").is_some());
        assert!(seed.field("LOCATION").is_some());
        assert!(seed.field("Radius").is_none());
    }

    #[test]
    fn missing_parent_surfaces_at_construction() {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "Orphan".into(),
            parent: Some("NeverLoaded".into()),
            fields: vec![],
        });
        let err = registry.construct("Orphan").unwrap_err();
        assert_eq!(
            err,
            ClassError::UnknownParent {
                class: "Orphan".into(),
                parent: "NeverLoaded".into(),
            }
        );
    }

    #[test]
    fn inheritance_cycle_detected() {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "A".into(),
            parent: Some("B".into()),
            fields: vec![],
        });
        registry.register_class(ClassSchema {
            name: "B".into(),
            parent: Some("A".into()),
            fields: vec![],
        });
        let err = registry.construct("A").unwrap_err();
        assert!(matches!(err, ClassError::InheritanceCycle(_)));
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "Mesh".into(),
            parent: None,
            fields: vec![field("First", PropertyType::Int)],
        });
        registry.register_class(ClassSchema {
            name: "MESH".into(),
            parent: None,
            fields: vec![field("Second", PropertyType::Int)],
        });
        let seed = registry.construct("Mesh").unwrap();
        assert!(seed.field("First").is_some());
        assert!(seed.field("Second").is_none());
    }

    #[test]
    fn package_load_marks_idempotent() {
        let mut registry = ClassRegistry::new();
        assert!(!registry.is_package_loaded("Core"));
        registry.mark_package_loaded("Core");
        assert!(registry.is_package_loaded("core"));
    }

    #[test]
    fn unload_keeps_intrinsics_only() {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "Actor".into(),
            parent: None,
            fields: vec![],
        });
        registry.mark_package_loaded("Core");
        registry.unload_class_packages();
        assert!(registry.resolve("Actor").is_none());
        assert!(registry.resolve("Object").is_some());
        assert!(!registry.is_package_loaded("Core"));
    }
}

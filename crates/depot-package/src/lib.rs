//! The Depot container format.
//!
//! A package file holds a summary, a name table, import and export tables,
//! and a payload region of per-object property-tag streams. This crate
//! parses all of it and owns the [`Package`] object with its
//! lazily-materialized, identity-stable object cache.
//!
//! # Architecture
//!
//! - **Summary** (`summary`): magic, version gates, table geometry, CRC
//! - **Tables** (`tables`): fixed-size import/export records
//! - **Properties** (`property`): tag-driven decoding with exact skips
//! - **Package** (`package`): the loaded container and its object cache
//! - **Builder** (`builder`): writer-side twin used by tooling and tests
//!
//! Cross-package reference resolution lives above this crate, in
//! `depot-loader`; a package only ever decodes references into
//! [`depot_types::PackageIndex`] values.

pub mod builder;
pub mod error;
pub mod object;
pub mod package;
pub mod property;
pub mod summary;
pub mod tables;

pub use builder::PackageBuilder;
pub use error::{PackageError, PackageResult};
pub use object::{LoadedObject, ObjectError, ObjectPayload, ObjectResult};
pub use package::{LoadOutcome, ObjectFailure, Package, PackageState};
pub use property::{
    decode_properties, DecodedProperties, Property, PropertyError, PropertyTag, PropertyValue,
    SkipReason, SkippedProperty, TagWriter,
};
pub use summary::{PackageSummary, CURRENT_VERSION, MIN_SUPPORTED_VERSION};
pub use tables::{ExportEntry, ImportEntry};

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use depot_class::{ClassRegistry, ClassSchema, FieldSchema};
    use depot_types::{ObjectFlags, PackageIndex, PropertyType};

    use super::*;

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassSchema {
            name: "StaticMesh".into(),
            parent: None,
            fields: vec![
                FieldSchema {
                    name: "Sections".into(),
                    ty: PropertyType::Int,
                },
                FieldSchema {
                    name: "Material".into(),
                    ty: PropertyType::Object,
                },
            ],
        });
        registry
    }

    fn parse(builder: PackageBuilder, name: &str) -> Package {
        let bytes = builder.finish_to_bytes().unwrap();
        Package::from_bytes(PathBuf::from(format!("{name}.dpk")), name.into(), &bytes).unwrap()
    }

    fn mesh_class(builder: &mut PackageBuilder) -> PackageIndex {
        builder.add_import("Core", "Class", "StaticMesh", "Core")
    }

    #[test]
    fn three_exports_load_with_names_from_table() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        for name in ["Barrel", "Crate", "Fence"] {
            b.add_object(class, PackageIndex::Null, name, ObjectFlags::PUBLIC, |w| {
                w.int("Sections", 2)
            });
        }
        let package = parse(b, "VillageArt");
        let registry = registry();

        let outcome = package.load_all(&registry, || false, |_, _| {});
        assert_eq!(outcome, LoadOutcome::Ready);
        assert!(package.is_ready());
        assert!(package.object_failures().is_empty());
        assert_eq!(package.loaded_object_count(), 3);

        let names: Vec<String> = (0..3)
            .map(|i| package.cached_object(i).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["Barrel", "Crate", "Fence"]);

        // Three distinct objects.
        let a = package.cached_object(0).unwrap();
        let b2 = package.cached_object(1).unwrap();
        assert!(!Arc::ptr_eq(&a, &b2));
    }

    #[test]
    fn object_identity_is_stable() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        b.add_object(class, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| {
            w.int("Sections", 1)
        });
        let package = parse(b, "Art");
        let registry = registry();

        let first = package.object_at(0, &registry).unwrap();
        let second = package.object_at(0, &registry).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_class_fails_only_that_object() {
        let mut b = PackageBuilder::new();
        let known = mesh_class(&mut b);
        let unknown = b.add_import("Core", "Class", "ParticleSystem", "Core");
        b.add_object(unknown, PackageIndex::Null, "Sparks", ObjectFlags::PUBLIC, |w| w);
        b.add_object(known, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| {
            w.int("Sections", 4)
        });
        let package = parse(b, "Art");
        let registry = registry();

        let outcome = package.load_all(&registry, || false, |_, _| {});
        assert_eq!(outcome, LoadOutcome::Ready);

        let failures = package.object_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "Sparks");
        assert!(failures[0].reason.contains("ParticleSystem"));

        let barrel = package.cached_object(1).unwrap();
        assert_eq!(
            barrel.property("Sections").unwrap().value,
            PropertyValue::Int(4)
        );
    }

    #[test]
    fn cancellation_leaves_partial_inspectable_state() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        for i in 0..5 {
            let name = format!("Mesh{i}");
            b.add_object(class, PackageIndex::Null, &name, ObjectFlags::PUBLIC, |w| {
                w.int("Sections", i)
            });
        }
        let package = parse(b, "Art");
        let registry = registry();

        // Cancel once two objects are through.
        let seen = AtomicU32::new(0);
        let outcome = package.load_all(
            &registry,
            || seen.load(Ordering::SeqCst) >= 2,
            |done, _| {
                seen.store(done, Ordering::SeqCst);
            },
        );

        assert_eq!(outcome, LoadOutcome::Cancelled);
        assert!(package.is_cancelled());
        assert!(!package.is_ready());
        assert_eq!(package.loaded_object_count(), 2);
        // Materialized objects are intact and reachable.
        assert_eq!(package.cached_object(0).unwrap().name, "Mesh0");
        assert!(package.cached_object(4).is_none());
    }

    #[test]
    fn load_all_is_idempotent_once_ready() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        b.add_object(class, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| {
            w.int("Sections", 1)
        });
        let package = parse(b, "Art");
        let registry = registry();

        assert_eq!(package.load_all(&registry, || false, |_, _| {}), LoadOutcome::Ready);
        let first = package.cached_object(0).unwrap();
        assert_eq!(package.load_all(&registry, || false, |_, _| {}), LoadOutcome::Ready);
        assert!(Arc::ptr_eq(&first, &package.cached_object(0).unwrap()));
    }

    #[test]
    fn compressed_payload_roundtrip() {
        let mut b = PackageBuilder::new().with_compression();
        let class = mesh_class(&mut b);
        b.add_object(class, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| {
            w.str("Label", "x".repeat(4096).as_str())
        });
        let bytes = b.finish_to_bytes().unwrap();
        let package =
            Package::from_bytes(PathBuf::from("art.dpk"), "Art".into(), &bytes).unwrap();
        assert!(package.summary().is_compressed());

        // Label is not in the schema: skipped, exactly, and recorded.
        let registry = registry();
        let object = package.object_at(0, &registry).unwrap();
        assert_eq!(object.skipped_properties().len(), 1);
        assert_eq!(object.skipped_properties()[0].name, "Label");
    }

    #[test]
    fn corrupted_table_region_detected() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        b.add_object(class, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| w);
        let mut bytes = b.finish_to_bytes().unwrap();
        // Flip one byte inside the name table.
        bytes[summary::SUMMARY_SIZE + 2] ^= 0xFF;
        let err =
            Package::from_bytes(PathBuf::from("art.dpk"), "Art".into(), &bytes).unwrap_err();
        assert!(matches!(err, PackageError::TableCrcMismatch { .. }));
    }

    #[test]
    fn outer_cycle_rejected_at_parse() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        // Two exports that claim each other as outer.
        b.add_object(class, PackageIndex::Export(1), "A", ObjectFlags::PUBLIC, |w| w);
        b.add_object(class, PackageIndex::Export(0), "B", ObjectFlags::PUBLIC, |w| w);
        let bytes = b.finish_to_bytes().unwrap();
        let err =
            Package::from_bytes(PathBuf::from("art.dpk"), "Art".into(), &bytes).unwrap_err();
        assert!(matches!(err, PackageError::OuterCycle { .. }));
    }

    #[test]
    fn class_definition_exports_parse_schemas() {
        let mut b = PackageBuilder::new();
        b.add_class(&ClassSchema {
            name: "Actor".into(),
            parent: Some("Object".into()),
            fields: vec![FieldSchema {
                name: "Location".into(),
                ty: PropertyType::Struct,
            }],
        });
        let package = parse(b, "Core");
        let registry = ClassRegistry::new();

        let object = package.object_at(0, &registry).unwrap();
        assert_eq!(object.class_name, "Class");
        match &object.payload {
            ObjectPayload::ClassDef(schema) => {
                assert_eq!(schema.name, "Actor");
                assert_eq!(schema.fields.len(), 1);
            }
            other => panic!("expected class definition, got {other:?}"),
        }
    }

    #[test]
    fn redirector_exports_parse_targets() {
        let mut b = PackageBuilder::new();
        let class = b.add_import("Core", "Class", "ObjectRedirector", "Core");
        b.add_redirector(class, "OldBarrel", "NewArt.Barrel");
        let package = parse(b, "Art");
        let registry = ClassRegistry::new();

        let object = package.object_at(0, &registry).unwrap();
        match &object.payload {
            ObjectPayload::Redirector { target } => {
                assert_eq!(target.to_string(), "NewArt.Barrel");
            }
            other => panic!("expected redirector, got {other:?}"),
        }
    }

    #[test]
    fn export_paths_follow_outer_chain() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        let outer = b.add_object(class, PackageIndex::Null, "Props", ObjectFlags::PUBLIC, |w| w);
        b.add_object(class, outer, "Barrel", ObjectFlags::PUBLIC, |w| w);
        let package = parse(b, "Village");

        let path = package.export_path(1).unwrap();
        assert_eq!(path.to_string(), "Village.Props.Barrel");
    }

    #[test]
    fn disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("village.dpk");

        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        b.add_object(class, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| {
            w.int("Sections", 3)
        });
        b.finish(&path).unwrap();

        let package = Package::open(&path).unwrap();
        assert_eq!(package.name(), "village");
        assert_eq!(package.exports().len(), 1);
        let registry = registry();
        let object = package.object_at(0, &registry).unwrap();
        assert_eq!(object.property("Sections").unwrap().value, PropertyValue::Int(3));
    }

    #[test]
    fn find_export_matches_name_and_class() {
        let mut b = PackageBuilder::new();
        let class = mesh_class(&mut b);
        b.add_object(class, PackageIndex::Null, "Barrel", ObjectFlags::PUBLIC, |w| w);
        let package = parse(b, "Art");

        assert_eq!(package.find_export("barrel", None), Some(0));
        assert_eq!(package.find_export("Barrel", Some("StaticMesh")), Some(0));
        assert_eq!(package.find_export("Barrel", Some("Texture")), None);
        assert_eq!(package.find_export("Missing", None), None);
    }
}

//! Logical-package → composite-container lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MapperResult;
use crate::persistent::PersistentData;

/// Where a composited package's bytes live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeSlot {
    /// Container file, absolute once built against a content root.
    pub container: PathBuf,
    pub offset: u64,
    pub size: u64,
}

/// Immutable index of packages that are not stored as standalone files but
/// inside merged containers.
#[derive(Debug, Default)]
pub struct CompositeMapper {
    slots: HashMap<String, CompositeSlot>,
}

impl CompositeMapper {
    /// Build from the persistent manifest, anchoring container paths at
    /// `root`.
    pub fn build(root: &Path, data: &PersistentData) -> MapperResult<Self> {
        let mut slots = HashMap::with_capacity(data.composites.len());
        for record in &data.composites {
            slots.insert(
                record.logical.to_ascii_lowercase(),
                CompositeSlot {
                    container: root.join(&record.container),
                    offset: record.offset,
                    size: record.size,
                },
            );
        }
        debug!(slots = slots.len(), "composite mapper built");
        Ok(Self { slots })
    }

    /// Find the slot for a logical package name, case-insensitive.
    pub fn locate(&self, package_name: &str) -> Option<&CompositeSlot> {
        self.slots.get(&package_name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::CompositeRecord;

    #[test]
    fn build_anchors_containers_at_root() {
        let data = PersistentData {
            composites: vec![CompositeRecord {
                logical: "VillageArt".into(),
                container: "merged/c0.dpk".into(),
                offset: 64,
                size: 1024,
            }],
            redirects: vec![],
        };
        let mapper = CompositeMapper::build(Path::new("/content"), &data).unwrap();
        let slot = mapper.locate("villageart").unwrap();
        assert_eq!(slot.container, PathBuf::from("/content/merged/c0.dpk"));
        assert_eq!(slot.offset, 64);
        assert!(mapper.locate("Other").is_none());
    }

    #[test]
    fn empty_manifest_builds_empty_mapper() {
        let mapper =
            CompositeMapper::build(Path::new("/content"), &PersistentData::default()).unwrap();
        assert!(mapper.is_empty());
    }
}

//! Package-name → file-path lookup over the content root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{MapperError, MapperResult};

/// Extension of package files found by the scan.
pub const PACKAGE_EXTENSION: &str = "dpk";

/// Immutable index of every package file under the content root, keyed by
/// lowercase file stem. Built once; shared read-only afterwards.
#[derive(Debug, Default)]
pub struct PackageMapper {
    entries: HashMap<String, PathBuf>,
}

impl PackageMapper {
    /// Walk `root` recursively and index every `*.dpk` file.
    ///
    /// Duplicate stems keep the first path found (walk order); later
    /// duplicates are logged and ignored.
    pub fn build(root: &Path) -> MapperResult<Self> {
        if !root.is_dir() {
            return Err(MapperError::BadContentRoot(root.display().to_string()));
        }

        let mut entries = HashMap::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| MapperError::Scan(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_package = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(PACKAGE_EXTENSION))
                .unwrap_or(false);
            if !is_package {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_ascii_lowercase())
            else {
                continue;
            };
            match entries.entry(stem) {
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(path.to_path_buf());
                }
                std::collections::hash_map::Entry::Occupied(slot) => {
                    warn!(
                        package = %slot.key(),
                        kept = %slot.get().display(),
                        ignored = %path.display(),
                        "duplicate package name in content tree"
                    );
                }
            }
        }

        debug!(packages = entries.len(), root = %root.display(), "content scan complete");
        Ok(Self { entries })
    }

    /// Absolute path of a package by name, case-insensitive.
    pub fn locate(&self, package_name: &str) -> Option<&Path> {
        self.entries
            .get(&package_name.to_ascii_lowercase())
            .map(PathBuf::as_path)
    }

    /// Number of indexed packages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the scan found nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate (name, path) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn scan_finds_nested_packages() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Core.dpk"));
        touch(&dir.path().join("Art/Village/VillageArt.dpk"));
        touch(&dir.path().join("Art/readme.txt"));

        let mapper = PackageMapper::build(dir.path()).unwrap();
        assert_eq!(mapper.len(), 2);
        assert!(mapper.locate("core").is_some());
        let village = mapper.locate("VILLAGEART").unwrap();
        assert!(village.ends_with("Art/Village/VillageArt.dpk"));
        assert!(mapper.locate("Missing").is_none());
    }

    #[test]
    fn extension_matched_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Loud.DPK"));
        let mapper = PackageMapper::build(dir.path()).unwrap();
        assert!(mapper.locate("Loud").is_some());
    }

    #[test]
    fn duplicate_stems_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/Pkg.dpk"));
        touch(&dir.path().join("b/Pkg.dpk"));
        let mapper = PackageMapper::build(dir.path()).unwrap();
        assert_eq!(mapper.len(), 1);
        assert!(mapper.locate("Pkg").is_some());
    }

    #[test]
    fn missing_root_rejected() {
        let err = PackageMapper::build(Path::new("/nonexistent/depot-root")).unwrap_err();
        assert!(matches!(err, MapperError::BadContentRoot(_)));
    }
}

//! The persistent manifest.
//!
//! Cooked content trees ship a JSON manifest at the content root recording
//! composited packages and object moves. It is an input of the loader;
//! Depot never writes it. A missing manifest is normal (classic installs
//! have none) and yields empty tables; a malformed one is fatal to startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MapperError, MapperResult};

/// File name looked up directly under the content root.
pub const MANIFEST_FILE_NAME: &str = "depot_manifest.json";

/// One composited package: the logical name content refers to, and where
/// its bytes actually live inside a merged container.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompositeRecord {
    pub logical: String,
    /// Container path relative to the content root.
    pub container: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub size: u64,
}

/// One recorded object move: `from` now lives at `to`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedirectRecord {
    pub from: String,
    pub to: String,
}

/// Parsed manifest contents.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistentData {
    #[serde(default)]
    pub composites: Vec<CompositeRecord>,
    #[serde(default)]
    pub redirects: Vec<RedirectRecord>,
}

impl PersistentData {
    /// Load the manifest from `root`, tolerating its absence.
    pub fn load(root: &Path) -> MapperResult<Self> {
        let path = root.join(MANIFEST_FILE_NAME);
        if !path.exists() {
            info!(root = %root.display(), "no persistent manifest; mappers start empty");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let data: Self = serde_json::from_str(&text)
            .map_err(|e| MapperError::MalformedManifest(e.to_string()))?;
        info!(
            composites = data.composites.len(),
            redirects = data.redirects.len(),
            "loaded persistent manifest"
        );
        Ok(data)
    }
}

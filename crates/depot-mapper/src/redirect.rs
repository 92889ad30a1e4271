//! Moved-object lookup with fixed-point chasing.

use std::collections::{HashMap, HashSet};

use depot_types::ObjectPath;
use tracing::debug;

use crate::error::{MapperError, MapperResult};
use crate::persistent::PersistentData;

/// Redirect chains longer than this are treated as corrupt metadata.
pub const MAX_REDIRECT_DEPTH: usize = 32;

/// Immutable index of recorded object moves.
///
/// A lookup follows chains (`A → B → C`) to their fixed point. A chain that
/// revisits a node is detected and reported, never looped.
#[derive(Debug, Default)]
pub struct RedirectorMapper {
    redirects: HashMap<String, ObjectPath>,
}

impl RedirectorMapper {
    /// Build from the persistent manifest.
    ///
    /// Malformed paths in the manifest are fatal: the table would otherwise
    /// silently drop moves.
    pub fn build(data: &PersistentData) -> MapperResult<Self> {
        let mut redirects = HashMap::with_capacity(data.redirects.len());
        for record in &data.redirects {
            let from = ObjectPath::parse(&record.from)
                .map_err(|e| MapperError::MalformedManifest(e.to_string()))?;
            let to = ObjectPath::parse(&record.to)
                .map_err(|e| MapperError::MalformedManifest(e.to_string()))?;
            redirects.insert(from.key().to_string(), to);
        }
        debug!(redirects = redirects.len(), "redirector mapper built");
        Ok(Self { redirects })
    }

    /// The immediate redirect for `path`, if one is recorded.
    pub fn lookup(&self, path: &ObjectPath) -> Option<&ObjectPath> {
        self.redirects.get(path.key())
    }

    /// Follow redirects from `path` to their fixed point.
    ///
    /// Returns `None` when nothing redirects `path`. Detects cycles and
    /// over-deep chains instead of looping.
    pub fn resolve_final(&self, path: &ObjectPath) -> MapperResult<Option<ObjectPath>> {
        let mut visited = HashSet::new();
        visited.insert(path.key().to_string());

        let mut current = match self.lookup(path) {
            None => return Ok(None),
            Some(next) => next,
        };
        let mut depth = 1usize;

        while let Some(next) = self.lookup(current) {
            if !visited.insert(current.key().to_string()) {
                return Err(MapperError::RedirectCycle {
                    start: path.clone(),
                    repeated: current.clone(),
                });
            }
            depth += 1;
            if depth > MAX_REDIRECT_DEPTH {
                return Err(MapperError::RedirectTooDeep {
                    start: path.clone(),
                    max: MAX_REDIRECT_DEPTH,
                });
            }
            current = next;
        }
        Ok(Some(current.clone()))
    }

    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }
}

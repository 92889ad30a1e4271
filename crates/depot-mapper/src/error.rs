use depot_types::ObjectPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("content root {0} does not exist or is not a directory")]
    BadContentRoot(String),

    #[error("content scan failed: {0}")]
    Scan(String),

    #[error("persistent manifest is malformed: {0}")]
    MalformedManifest(String),

    #[error("redirect chain starting at {start} revisits {repeated}")]
    RedirectCycle {
        start: ObjectPath,
        repeated: ObjectPath,
    },

    #[error("redirect chain starting at {start} exceeds depth {max}")]
    RedirectTooDeep { start: ObjectPath, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MapperResult<T> = Result<T, MapperError>;

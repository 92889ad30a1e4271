use depot_class::ClassError;
use depot_mapper::MapperError;
use depot_package::{ObjectError, PackageError};
use depot_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("package {0} not found under the content root or any mapper")]
    PackageNotFound(String),

    #[error("package {path} previously failed: {reason}")]
    PackageFailed { path: String, reason: String },

    #[error("no export named {object} in package {package}")]
    MissingExport { package: String, object: String },

    #[error("package {package} has no import at index {index} (table holds {count})")]
    NoSuchImport {
        package: String,
        index: u32,
        count: usize,
    },

    #[error("import chain revisits {repeated} (started from {start})")]
    ImportCycle { start: String, repeated: String },

    #[error("import chain starting at {start} exceeds depth {max}")]
    ImportTooDeep { start: String, max: usize },

    #[error("composite slot for {logical}: range [{offset}, {offset}+{size}) exceeds container {container} ({len} bytes)")]
    CompositeSliceOutOfRange {
        logical: String,
        container: String,
        offset: u64,
        size: u64,
        len: u64,
    },

    #[error("class package {name}: {reason}")]
    ClassPackage { name: String, reason: String },

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Mapper(#[from] MapperError),

    #[error(transparent)]
    Class(#[from] ClassError),

    #[error(transparent)]
    Types(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LoaderResult<T> = Result<T, LoaderError>;

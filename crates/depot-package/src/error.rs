use depot_stream::StreamError;
use depot_types::TypeError;
use thiserror::Error;

/// Errors that are fatal to the whole package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("invalid package magic: expected DPAK, got {actual}")]
    InvalidMagic { actual: String },

    #[error("unsupported package version {0} (supported {min}..={max})",
        min = crate::summary::MIN_SUPPORTED_VERSION,
        max = crate::summary::CURRENT_VERSION)]
    UnsupportedVersion(u16),

    #[error("table checksum mismatch: summary says {expected:#010x}, computed {actual:#010x}")]
    TableCrcMismatch { expected: u32, actual: u32 },

    #[error("table region [{start}, {end}) lies outside the file ({len} bytes)")]
    TableRegionOutOfRange { start: u64, end: u64, len: u64 },

    #[error("export {export} has a cyclic outer chain")]
    OuterCycle { export: u32 },

    #[error("export {export} references out-of-range {what} {index}")]
    BadTableRef {
        export: u32,
        what: &'static str,
        index: i32,
    },

    #[error("payload decompression failed: {0}")]
    Decompression(String),

    #[error("payload compression failed: {0}")]
    Compression(String),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Types(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackageResult<T> = Result<T, PackageError>;

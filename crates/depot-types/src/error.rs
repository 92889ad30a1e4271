use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("name index {index} out of range (table holds {len} names)")]
    NameOutOfRange { index: u32, len: usize },

    #[error("package index {0} is not an export")]
    NotAnExport(i32),

    #[error("package index {0} is not an import")]
    NotAnImport(i32),

    #[error("invalid object path: {0:?}")]
    InvalidPath(String),

    #[error("invalid guid length: expected 16, got {0}")]
    InvalidGuidLength(usize),
}

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassError {
    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("class {class} names unknown parent {parent}")]
    UnknownParent { class: String, parent: String },

    #[error("inheritance cycle through class {0}")]
    InheritanceCycle(String),

    #[error("malformed class schema: {0}")]
    MalformedSchema(String),
}

pub type ClassResult<T> = Result<T, ClassError>;

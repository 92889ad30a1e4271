use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("unexpected end of stream at offset {offset}: wanted {wanted} bytes, {remaining} remain")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },

    #[error("seek target {target} beyond stream length {len}")]
    SeekOutOfRange { target: usize, len: usize },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("string length {len} at offset {offset} exceeds cap {cap}")]
    StringTooLong { offset: usize, len: u32, cap: u32 },

    #[error("boolean at offset {offset} has value {value}, expected 0 or 1")]
    InvalidBool { offset: usize, value: u32 },
}

pub type StreamResult<T> = Result<T, StreamError>;
